pub const AURA_API_KEY: &str = "AURA_API_KEY";

pub const BASE_URL: &str = "wss://speech.aura-journal.app/v1";
pub const DEFAULT_MODEL: &str = "aura-speech-realtime";

pub const AUTHORIZATION_HEADER: &str = "Authorization";
