pub mod key;
pub mod producer;
pub mod serializer;


pub use key::{partition_key, KEY_SEPARATOR};
pub use producer::{build_producer, client_config, KafkaProducer, MessageSink};
pub use serializer::JsonSerializer;
