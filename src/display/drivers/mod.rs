pub mod max7219;
pub mod mock;

pub use max7219::Max7219;
pub use mock::MockDriver;
