use std::env;

/// Default Lifemapper web server
pub const DEFAULT_SERVER: &str = "http://lifemapper.org";
/// Identity used when no user is given; never logs in
pub const DEFAULT_ANONYMOUS_USER: &str = "anon";
/// Read-only archive identity; never logs in
pub const DEFAULT_ARCHIVE_USER: &str = "kubi";
/// Name this library is listed under in the version-info document
pub const DEFAULT_CLIENT_NAME: &str = "lmClientLib";

/// Connection settings for a Lifemapper session
#[derive(Clone)]
pub struct ClientConfig {
    pub server: String,
    pub user_id: String,
    pub credential: Option<String>,
    pub anonymous_user: String,
    pub archive_user: String,
    /// Version-info endpoint; derived from `server` when unset
    pub version_url: Option<String>,
    pub client_name: String,
}

impl ClientConfig {
    /// Anonymous access to `server`
    pub fn new(server: &str) -> Self {
        Self {
            server: server.trim_end_matches('/').to_string(),
            user_id: DEFAULT_ANONYMOUS_USER.to_string(),
            credential: None,
            anonymous_user: DEFAULT_ANONYMOUS_USER.to_string(),
            archive_user: DEFAULT_ARCHIVE_USER.to_string(),
            version_url: None,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        }
    }

    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        let server = env::var("LM_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        let mut config = Self::new(&server);

        if let Ok(user) = env::var("LM_USER") {
            config.user_id = user;
        }
        config.credential = env::var("LM_PASSWORD").ok();
        if let Ok(anonymous) = env::var("LM_ANONYMOUS_USER") {
            config.anonymous_user = anonymous;
        }
        if let Ok(archive) = env::var("LM_ARCHIVE_USER") {
            config.archive_user = archive;
        }
        config.version_url = env::var("LM_VERSION_URL").ok();
        if let Ok(name) = env::var("LM_CLIENT_NAME") {
            config.client_name = name;
        }

        config
    }

    pub fn with_credentials(mut self, user_id: &str, credential: &str) -> Self {
        self.user_id = user_id.to_string();
        self.credential = Some(credential.to_string());
        self
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = user_id.to_string();
        self
    }

    pub fn with_version_url(mut self, url: &str) -> Self {
        self.version_url = Some(url.to_string());
        self
    }

    pub fn with_client_name(mut self, name: &str) -> Self {
        self.client_name = name.to_string();
        self
    }

    /// URL of the version-info document
    pub fn version_url(&self) -> String {
        self.version_url
            .clone()
            .unwrap_or_else(|| format!("{}/clients/versions.xml", self.server))
    }

    /// True for the anonymous and archive identities, which never log in and
    /// cannot use identity-scoped services
    pub fn is_shared_identity(&self) -> bool {
        self.user_id == self.anonymous_user || self.user_id == self.archive_user
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server", &self.server)
            .field("user_id", &self.user_id)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("anonymous_user", &self.anonymous_user)
            .field("archive_user", &self.archive_user)
            .field("version_url", &self.version_url)
            .field("client_name", &self.client_name)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER)
    }
}
