pub mod billing;
pub mod clinical;
pub mod doctor;
pub mod enums;
pub mod management;
pub mod messaging;
pub mod patient;
pub mod user;

pub use billing::*;
pub use clinical::*;
pub use doctor::*;
pub use enums::*;
pub use management::*;
pub use messaging::*;
pub use patient::*;
pub use user::*;
