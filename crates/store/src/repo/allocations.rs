use crate::error::StoreResult;
use crate::models::Allocation;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

pub async fn by_experiment(pool: &PgPool, experiment_id: Uuid) -> StoreResult<Vec<Allocation>> {
    Ok(sqlx::query_as::<_, Allocation>(
        "SELECT id, experiment_id, variant_id, range_start, range_end FROM allocations WHERE experiment_id = $1 ORDER BY range_start",
    )
    .bind(experiment_id)
    .fetch_all(pool)
    .await?)
}

pub async fn by_experiment_ids(pool: &PgPool, experiment_ids: &[Uuid]) -> StoreResult<Vec<Allocation>> {
    Ok(sqlx::query_as::<_, Allocation>(
        "SELECT id, experiment_id, variant_id, range_start, range_end FROM allocations WHERE experiment_id = ANY($1)",
    )
    .bind(experiment_ids)
    .fetch_all(pool)
    .await?)
}

/// One entry of a `PUT /experiments/:id/allocations` request body.
pub struct AllocationInput {
    pub variant_id: Uuid,
    pub range_start: i32,
    pub range_end: i32,
}

/// Replace the full set of allocations for an experiment: delete-then-insert
/// in one transaction. Range/overlap validation happens before this is
/// called — this function trusts its input.
pub async fn replace_all(
    pool: &PgPool,
    experiment_id: Uuid,
    allocations: &[AllocationInput],
) -> StoreResult<Vec<Allocation>> {
    let mut tx: Transaction<'_, Postgres> = pool.begin().await?;

    sqlx::query("DELETE FROM allocations WHERE experiment_id = $1")
        .bind(experiment_id)
        .execute(&mut *tx)
        .await?;

    for allocation in allocations {
        sqlx::query(
            r#"
            INSERT INTO allocations (experiment_id, variant_id, range_start, range_end)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(experiment_id)
        .bind(allocation.variant_id)
        .bind(allocation.range_start)
        .bind(allocation.range_end)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    by_experiment(pool, experiment_id).await
}

/// Pure validation, independent of the database: ranges within bounds,
/// start <= end, and no overlap once sorted. Exposed here so both the
/// control-plane handler and tests share one implementation.
pub fn validate_ranges(allocations: &[AllocationInput]) -> Result<(), String> {
    for a in allocations {
        if !(0..=9999).contains(&a.range_start) || !(0..=9999).contains(&a.range_end) {
            return Err(format!(
                "allocation range out of bounds: [{}, {}]",
                a.range_start, a.range_end
            ));
        }
        if a.range_start > a.range_end {
            return Err(format!(
                "allocation rangeStart must be <= rangeEnd: [{}, {}]",
                a.range_start, a.range_end
            ));
        }
    }

    let mut sorted: Vec<&AllocationInput> = allocations.iter().collect();
    sorted.sort_by_key(|a| a.range_start);
    for window in sorted.windows(2) {
        if window[1].range_start <= window[0].range_end {
            return Err(format!(
                "overlapping allocation ranges: [{}, {}] and [{}, {}]",
                window[0].range_start, window[0].range_end, window[1].range_start, window[1].range_end
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(variant_id: Uuid, start: i32, end: i32) -> AllocationInput {
        AllocationInput {
            variant_id,
            range_start: start,
            range_end: end,
        }
    }

    #[test]
    fn non_overlapping_ranges_are_valid_even_with_gaps() {
        let v = Uuid::new_v4();
        let allocations = vec![input(v, 0, 4999), input(v, 6000, 9999)];
        assert!(validate_ranges(&allocations).is_ok());
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let v = Uuid::new_v4();
        let allocations = vec![input(v, 0, 5000), input(v, 4000, 9999)];
        assert!(validate_ranges(&allocations).is_err());
    }

    #[test]
    fn out_of_bounds_range_is_rejected() {
        let v = Uuid::new_v4();
        let allocations = vec![input(v, 0, 10000)];
        assert!(validate_ranges(&allocations).is_err());
    }

    #[test]
    fn start_greater_than_end_is_rejected() {
        let v = Uuid::new_v4();
        let allocations = vec![input(v, 100, 50)];
        assert!(validate_ranges(&allocations).is_err());
    }
}
