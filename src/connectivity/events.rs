use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};

pub const LINK_EVENT_QUEUE_LEN: usize = 8;

/// Notifications from the radio driver, queued for the connectivity manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    StaAssociated,
    StaDisconnected { reason: u8 },
    GotIp { address: [u8; 4] },
    ApClientJoined { aid: u16 },
    ApClientLeft { aid: u16 },
}

pub type LinkEvents = Channel<CriticalSectionRawMutex, LinkEvent, LINK_EVENT_QUEUE_LEN>;

/// Inputs of the connectivity state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Boot { has_credentials: bool },
    StaDisconnected,
    GotIp,
    ConnectTimeout,
    ProvisioningStarted,
    ApClientLeft,
}

impl ConnectivityEvent {
    pub(crate) fn from_link(event: LinkEvent) -> Option<Self> {
        match event {
            LinkEvent::StaDisconnected { .. } => Some(Self::StaDisconnected),
            LinkEvent::GotIp { .. } => Some(Self::GotIp),
            LinkEvent::ApClientLeft { .. } => Some(Self::ApClientLeft),
            LinkEvent::StaAssociated | LinkEvent::ApClientJoined { .. } => None,
        }
    }

    pub const fn trigger(self) -> Trigger {
        match self {
            Self::Boot {
                has_credentials: true,
            } => Trigger::Boot,
            Self::Boot {
                has_credentials: false,
            } => Trigger::NoCredentials,
            Self::StaDisconnected => Trigger::StaDisconnected,
            Self::GotIp => Trigger::GotIp,
            Self::ConnectTimeout => Trigger::ConnectTimeout,
            Self::ProvisioningStarted => Trigger::ProvisioningStarted,
            Self::ApClientLeft => Trigger::ApClientLeft,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Trigger {
    None = 0,
    Boot = 1,
    NoCredentials = 2,
    StaDisconnected = 3,
    GotIp = 4,
    ConnectTimeout = 5,
    ProvisioningStarted = 6,
    ApClientLeft = 7,
}

impl Trigger {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Boot => "boot",
            Self::NoCredentials => "no_credentials",
            Self::StaDisconnected => "sta_disconnected",
            Self::GotIp => "got_ip",
            Self::ConnectTimeout => "connect_timeout",
            Self::ProvisioningStarted => "provisioning_started",
            Self::ApClientLeft => "ap_client_left",
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Boot,
            2 => Self::NoCredentials,
            3 => Self::StaDisconnected,
            4 => Self::GotIp,
            5 => Self::ConnectTimeout,
            6 => Self::ProvisioningStarted,
            7 => Self::ApClientLeft,
            _ => Self::None,
        }
    }
}
