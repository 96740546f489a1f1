use thiserror::Error;
use uuid::Uuid;

use crate::{backend::GatewayError, domain::message::SenderProfile};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile not found")]
    NotFound,
    #[error("connection lost")]
    TemporarilyUnavailable,
}

pub trait ProfileSource {
    fn fetch_profile(&self, user_id: Uuid) -> Result<SenderProfile, GatewayError>;
}

pub fn load_profile(source: &dyn ProfileSource, user_id: Uuid) -> Result<SenderProfile, ProfileError> {
    source.fetch_profile(user_id).map_err(|error| match error {
        GatewayError::NotFound(_) | GatewayError::Unauthorized => ProfileError::NotFound,
        _ => ProfileError::TemporarilyUnavailable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{profile, PLAYER};

    struct StubSource(Result<SenderProfile, GatewayError>);

    impl ProfileSource for StubSource {
        fn fetch_profile(&self, _user_id: Uuid) -> Result<SenderProfile, GatewayError> {
            self.0.clone()
        }
    }

    #[test]
    fn returns_profile_from_source() {
        let source = StubSource(Ok(profile(PLAYER, "Jordan Miles")));

        assert_eq!(
            load_profile(&source, PLAYER),
            Ok(profile(PLAYER, "Jordan Miles"))
        );
    }

    #[test]
    fn hidden_profile_reads_as_not_found() {
        let source = StubSource(Err(GatewayError::Unauthorized));

        assert_eq!(load_profile(&source, PLAYER), Err(ProfileError::NotFound));
    }
}
