// src/users/validators.rs

use super::models::UpdateProfileRequest;
use crate::common::{ValidationResult, Validator};

pub const MAX_NAME_LEN: usize = 80;
pub const MAX_BIO_LEN: usize = 280;
pub const MAX_AVATAR_URL_LEN: usize = 500;

pub struct ProfileValidator;

impl Validator<UpdateProfileRequest> for ProfileValidator {
    fn validate(&self, data: &UpdateProfileRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(name) = &data.name {
            if name.len() > MAX_NAME_LEN {
                result.add_error("name", "Name must not exceed 80 characters");
            }
        }

        if let Some(bio) = &data.bio {
            if bio.len() > MAX_BIO_LEN {
                result.add_error("bio", "Bio must not exceed 280 characters");
            }
        }

        if let Some(avatar_url) = &data.avatar_url {
            if avatar_url.len() > MAX_AVATAR_URL_LEN {
                result.add_error("avatarUrl", "Avatar URL must not exceed 500 characters");
            }
        }

        result
    }
}
