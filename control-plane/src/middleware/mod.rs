mod correlation_id;

pub use correlation_id::correlation_id_layer;
