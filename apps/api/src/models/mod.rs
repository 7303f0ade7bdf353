pub mod session;
pub mod subscription;
