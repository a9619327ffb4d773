use core::sync::atomic::{AtomicBool, Ordering};

use embassy_net::Stack;
use embassy_time::Duration;
use esp_radio::wifi::{
    event::{self, EventExt},
    AccessPointConfig as RadioApConfig, AuthMethod, ClientConfig, Config as WifiRuntimeConfig,
    InternalWifiError, ModeConfig, ScanConfig, ScanMethod, ScanTypeConfig, WifiController,
    WifiError,
};

use crate::connectivity::{LinkDriver, LinkEvent, LinkEvents, ScanResults};
use crate::error::LinkError;
use crate::types::{AccessPointConfig, Credentials, ScanRecord};

const WIFI_RX_QUEUE_SIZE: usize = 3;
const WIFI_TX_QUEUE_SIZE: usize = 2;
const WIFI_STATIC_RX_BUF_NUM: u8 = 4;
const WIFI_DYNAMIC_RX_BUF_NUM: u16 = 8;
const WIFI_DYNAMIC_TX_BUF_NUM: u16 = 8;
const WIFI_RX_BA_WIN: u8 = 3;
const SCAN_ACTIVE_MIN_MS: u64 = 100;
const SCAN_ACTIVE_MAX_MS: u64 = 300;

static EVENT_FORWARDERS_INSTALLED: AtomicBool = AtomicBool::new(false);

pub(super) fn wifi_runtime_config() -> WifiRuntimeConfig {
    WifiRuntimeConfig::default()
        .with_rx_queue_size(WIFI_RX_QUEUE_SIZE)
        .with_tx_queue_size(WIFI_TX_QUEUE_SIZE)
        .with_static_rx_buf_num(WIFI_STATIC_RX_BUF_NUM)
        .with_dynamic_rx_buf_num(WIFI_DYNAMIC_RX_BUF_NUM)
        .with_dynamic_tx_buf_num(WIFI_DYNAMIC_TX_BUF_NUM)
        .with_ampdu_rx_enable(false)
        .with_ampdu_tx_enable(false)
        .with_rx_ba_win(WIFI_RX_BA_WIN)
}

pub(super) fn link_error(err: WifiError) -> LinkError {
    match err {
        WifiError::InvalidArguments => LinkError::InvalidConfig,
        WifiError::NotInitialized => LinkError::NotInitialized,
        WifiError::InternalError(InternalWifiError::NoMem) => LinkError::NoMem,
        WifiError::Unsupported => LinkError::StartFailed,
        _ => LinkError::Driver(-1),
    }
}

/// `esp-radio` controller behind [`LinkDriver`].
pub struct RadioLink {
    controller: WifiController<'static>,
    mac: [u8; 6],
    station: Option<ClientConfig>,
}

impl RadioLink {
    pub fn new(controller: WifiController<'static>, mac: [u8; 6]) -> Self {
        Self {
            controller,
            mac,
            station: None,
        }
    }

    async fn ensure_started(&mut self) -> Result<(), LinkError> {
        if matches!(self.controller.is_started(), Ok(true)) {
            return Ok(());
        }
        self.controller.start_async().await.map_err(link_error)
    }
}

impl LinkDriver for RadioLink {
    async fn start_station(&mut self, credentials: &Credentials) -> Result<(), LinkError> {
        // Open threshold: secured networks still negotiate their own mode.
        let auth_method = if credentials.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::Wpa2Personal
        };
        let client = ClientConfig::default()
            .with_ssid(credentials.ssid().into())
            .with_password(credentials.passphrase().into())
            .with_auth_method(auth_method)
            .with_scan_method(ScanMethod::AllChannels);
        self.controller
            .set_config(&ModeConfig::Client(client.clone()))
            .map_err(link_error)?;
        self.station = Some(client);
        self.ensure_started().await
    }

    async fn connect(&mut self) -> Result<(), LinkError> {
        self.controller
            .connect_async()
            .await
            .map_err(|_| LinkError::ConnectRejected)
    }

    async fn start_access_point(&mut self, config: &AccessPointConfig) -> Result<(), LinkError> {
        let auth_method = if config.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WpaWpa2Personal
        };
        let access_point = RadioApConfig::default()
            .with_ssid(config.ssid.as_str().into())
            .with_password(config.passphrase.as_str().into())
            .with_channel(config.channel)
            .with_max_connections(config.max_clients as u16)
            .with_auth_method(auth_method);
        let station = self.station.clone().unwrap_or_default();
        self.controller
            .set_config(&ModeConfig::ApSta(station, access_point))
            .map_err(link_error)?;
        self.ensure_started().await
    }

    async fn scan(&mut self, max: usize) -> Result<ScanResults, LinkError> {
        let config = ScanConfig::default()
            .with_show_hidden(false)
            .with_max(max)
            .with_scan_type(ScanTypeConfig::Active {
                min: Duration::from_millis(SCAN_ACTIVE_MIN_MS).into(),
                max: Duration::from_millis(SCAN_ACTIVE_MAX_MS).into(),
            });
        let found = self
            .controller
            .scan_with_config_async(config)
            .await
            .map_err(|err| match err {
                WifiError::InternalError(InternalWifiError::NoMem) => LinkError::NoMem,
                _ => LinkError::ScanStart,
            })?;

        let mut results = ScanResults::new();
        for ap in found.iter().take(max) {
            if results
                .push(ScanRecord::new(&ap.ssid, ap.signal_strength))
                .is_err()
            {
                break;
            }
        }
        Ok(results)
    }

    fn mac_address(&self) -> [u8; 6] {
        self.mac
    }
}

/// Routes radio callbacks into `events`. Installed once per boot.
pub fn install_event_forwarders(events: &'static LinkEvents) {
    if EVENT_FORWARDERS_INSTALLED.swap(true, Ordering::Relaxed) {
        return;
    }

    event::StaConnected::update_handler(move |_| {
        forward(events, LinkEvent::StaAssociated);
    });

    event::StaDisconnected::update_handler(move |event| {
        forward(
            events,
            LinkEvent::StaDisconnected {
                reason: event.reason(),
            },
        );
    });

    event::ApStaconnected::update_handler(move |event| {
        forward(events, LinkEvent::ApClientJoined { aid: event.aid() as u16 });
    });

    event::ApStadisconnected::update_handler(move |event| {
        forward(events, LinkEvent::ApClientLeft { aid: event.aid() as u16 });
    });
}

fn forward(events: &LinkEvents, event: LinkEvent) {
    if events.try_send(event).is_err() {
        log::warn!("wifi: event queue full, dropped {:?}", event);
    }
}

/// Reports every DHCP lease on the station interface as [`LinkEvent::GotIp`].
pub async fn watch_station_address(stack: Stack<'static>, events: &'static LinkEvents) -> ! {
    loop {
        stack.wait_config_up().await;
        if let Some(config) = stack.config_v4() {
            events
                .send(LinkEvent::GotIp {
                    address: config.address.address().octets(),
                })
                .await;
        }
        stack.wait_config_down().await;
    }
}
