pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod history;
pub mod patient;

pub use appointment::*;
pub use doctor::*;
pub use enums::*;
pub use history::*;
pub use patient::*;
