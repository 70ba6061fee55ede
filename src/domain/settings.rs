use crate::domain::{KeyParseError, PrivateKey, Project, PublicKey};
use thiserror::Error;

/// Credentials and account details every remote call is made with.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Settings {
    pub auth_header: String,
    pub private_key: Option<PrivateKey>,
    pub public_key: Option<PublicKey>,
    pub open_orders_address: Option<PublicKey>,
    pub project: Project,
}

impl Settings {
    pub fn needs_init(&self) -> bool {
        self.auth_header.is_empty()
    }
}

/// Raw text of the settings form, in field order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SettingsInput {
    pub auth_header: String,
    pub private_key: String,
    pub public_key: String,
    pub open_orders_address: String,
    pub project: String,
}

impl SettingsInput {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            auth_header: settings.auth_header.clone(),
            private_key: settings
                .private_key
                .as_ref()
                .map(PrivateKey::to_base58)
                .unwrap_or_default(),
            public_key: settings
                .public_key
                .map(|key| key.to_base58())
                .unwrap_or_default(),
            open_orders_address: settings
                .open_orders_address
                .map(|key| key.to_base58())
                .unwrap_or_default(),
            project: if settings.project.is_unknown() {
                String::new()
            } else {
                settings.project.to_string()
            },
        }
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SettingsError {
    #[error("auth header cannot be empty")]
    EmptyAuthHeader,

    #[error("invalid private key: {0}")]
    PrivateKey(KeyParseError),

    #[error("invalid public key: {0}")]
    PublicKey(KeyParseError),

    #[error("invalid open orders address: {0}")]
    OpenOrdersAddress(KeyParseError),

    #[error("invalid project value: {0:?}")]
    Project(String),
}

impl SettingsError {
    /// Index of the form field the error belongs to.
    pub fn field_index(&self) -> usize {
        match self {
            Self::EmptyAuthHeader => 0,
            Self::PrivateKey(_) => 1,
            Self::PublicKey(_) => 2,
            Self::OpenOrdersAddress(_) => 3,
            Self::Project(_) => 4,
        }
    }
}

/// Validates every field in order and only produces settings when all of them parse.
pub fn validate_settings(input: &SettingsInput) -> Result<Settings, SettingsError> {
    let auth_header = input.auth_header.trim();
    if auth_header.is_empty() {
        return Err(SettingsError::EmptyAuthHeader);
    }

    let private_key = if input.private_key.trim().is_empty() {
        None
    } else {
        Some(PrivateKey::from_base58(&input.private_key).map_err(SettingsError::PrivateKey)?)
    };

    // A keypair already carries its public half.
    let public_key = match &private_key {
        Some(private_key) if input.public_key.trim().is_empty() => private_key.public_key(),
        _ => PublicKey::from_base58(&input.public_key).map_err(SettingsError::PublicKey)?,
    };
    let open_orders_address = PublicKey::from_base58(&input.open_orders_address)
        .map_err(SettingsError::OpenOrdersAddress)?;

    let project = Project::parse(&input.project)
        .ok_or_else(|| SettingsError::Project(input.project.clone()))?;

    Ok(Settings {
        auth_header: auth_header.to_string(),
        private_key,
        public_key: Some(public_key),
        open_orders_address: Some(open_orders_address),
        project,
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn valid_input_produces_settings() {
        let settings = validate_settings(&valid_input()).expect("valid");
        assert_eq!(settings.auth_header, "auth-token");
        assert!(settings.private_key.is_none());
        assert_eq!(settings.project, Project::Serum);
        assert!(!settings.needs_init());
    }

    #[test]
    fn empty_auth_header_fails_first() {
        let mut input = valid_input();
        input.auth_header = "  ".to_string();
        input.public_key = "garbage!".to_string();
        assert_eq!(
            validate_settings(&input),
            Err(SettingsError::EmptyAuthHeader)
        );
    }

    #[test]
    fn each_key_field_is_named_in_its_error() {
        let mut input = valid_input();
        input.private_key = "not-base58-0OIl".to_string();
        let error = validate_settings(&input).unwrap_err();
        assert_eq!(error.field_index(), 1);
        assert!(error.to_string().starts_with("invalid private key"));

        let mut input = valid_input();
        input.public_key = key(1)[..10].to_string();
        let error = validate_settings(&input).unwrap_err();
        assert_eq!(error.field_index(), 2);
        assert!(error.to_string().starts_with("invalid public key"));

        let mut input = valid_input();
        input.open_orders_address = String::new();
        let error = validate_settings(&input).unwrap_err();
        assert_eq!(error.field_index(), 3);
    }

    #[test]
    fn public_key_defaults_to_private_key_half() {
        let mut raw = [3u8; 64];
        raw[32..].copy_from_slice(&[1u8; 32]);
        let mut input = valid_input();
        input.private_key = bs58::encode(raw).into_string();
        input.public_key = String::new();

        let settings = validate_settings(&input).expect("valid");
        assert_eq!(settings.public_key.map(|k| k.to_base58()), Some(key(1)));

        input.private_key = String::new();
        assert!(matches!(
            validate_settings(&input),
            Err(SettingsError::PublicKey(KeyParseError::Empty))
        ));
    }

    #[test]
    fn unknown_project_is_rejected() {
        let mut input = valid_input();
        input.project = "P_UNKNOWN".to_string();
        assert_eq!(
            validate_settings(&input),
            Err(SettingsError::Project("P_UNKNOWN".to_string()))
        );
    }

    #[test]
    fn input_round_trips_from_settings() {
        let settings = validate_settings(&valid_input()).expect("valid");
        assert_eq!(SettingsInput::from_settings(&settings), valid_input());
        assert_eq!(
            SettingsInput::from_settings(&Settings::default()),
            SettingsInput::default()
        );
    }
}
