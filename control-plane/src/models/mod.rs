mod pagination;

pub use pagination::{PageQuery, PaginatedResponse, PaginationMeta};
