pub mod notifier;
pub mod registry;
pub mod scanner;
pub mod stream;
