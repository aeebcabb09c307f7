pub mod incident;
pub mod oncall;
pub mod shift;
pub mod user;

pub use incident::*;
pub use oncall::*;
pub use shift::*;
pub use user::*;
