pub mod destroy;
pub mod halt;
pub mod image;
pub mod provision;
pub mod rsync;
pub mod ssh;
pub mod status;
pub mod up;
