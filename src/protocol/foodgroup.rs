//! Foodgroup, subgroup and TLV tag numbers.

/// Generic service controls.
pub const OSERVICE: u16 = 0x0001;
/// Presence notifications for buddies.
pub const BUDDY: u16 = 0x0003;
/// Instant messages.
pub const ICBM: u16 = 0x0004;
/// Server-stored buddy lists.
pub const FEEDBAG: u16 = 0x0013;
/// Login (challenge/response authentication).
pub const BUCP: u16 = 0x0017;

/// Foodgroups advertised to a client in `OSERVICE/HostOnline`.
pub const SUPPORTED_FOODGROUPS: [u16; 4] = [OSERVICE, BUDDY, ICBM, FEEDBAG];

pub mod bucp {
    pub const LOGIN_REQUEST: u16 = 0x0002;
    pub const LOGIN_RESPONSE: u16 = 0x0003;
    pub const CHALLENGE_REQUEST: u16 = 0x0006;
    pub const CHALLENGE_RESPONSE: u16 = 0x0007;
}

pub mod oservice {
    pub const HOST_ONLINE: u16 = 0x0003;
}

/// TLV tags used by the login flow.
pub mod tag {
    pub const SCREEN_NAME: u16 = 0x0001;
    pub const ROASTED_PASSWORD: u16 = 0x0002;
    pub const CLIENT_ID: u16 = 0x0003;
    pub const ERROR_URL: u16 = 0x0004;
    pub const BOS_ADDRESS: u16 = 0x0005;
    pub const BOS_COOKIE: u16 = 0x0006;
    pub const ERROR_CODE: u16 = 0x0008;
    pub const UNKNOWN_000C: u16 = 0x000C;
    pub const EMAIL: u16 = 0x0011;
    pub const PASSWORD_HASH: u16 = 0x0025;
    pub const CHANGE_PASSWORD_URL: u16 = 0x0054;
}

/// Values carried in [`tag::ERROR_CODE`].
pub mod error_code {
    /// Direct sign-on: bad screen name or password.
    pub const INVALID_NICK_OR_PASSWORD: u16 = 0x0004;
    /// BUCP: bad password.
    pub const INCORRECT_PASSWORD: u16 = 0x0005;
}
