pub mod consumer;
pub mod source;

pub use self::consumer::KafkaSource;
pub use self::source::{Delivery, MessageSource, ReplaySource};
