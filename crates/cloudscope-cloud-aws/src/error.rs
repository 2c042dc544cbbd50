//! AWS provider error types

use aws_sdk_ec2::error::{DisplayErrorContext, SdkError};
use cloudscope_cloud::CloudError;
use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("EC2 API error: {0}")]
    Api(String),
}

impl<E, R> From<SdkError<E, R>> for AwsError
where
    E: std::error::Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    fn from(err: SdkError<E, R>) -> Self {
        AwsError::Api(DisplayErrorContext(&err).to_string())
    }
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::Api(message) => CloudError::ApiError(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
