pub mod export;
pub mod import;
pub mod inspect;
pub mod verify;
