//! Amazon EC2 provider for HostFlow
//!
//! Talks to EC2 through `aws-sdk-ec2` with the default AWS credential chain
//! (environment, shared config, instance profile).

pub mod client;
pub mod error;

pub use client::{Ec2Client, image_phase, instance_phase};
pub use error::classify_error_code;
