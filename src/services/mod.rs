// Cross-cutting service objects

pub mod events;

pub use events::EventPublisher;
