//! ESP32 bring-up: radio and network stacks, flash-backed credentials, the
//! provisioning socket, restart and logging.
//!
//! Camera, WebSocket session hub and mDNS responder are board specific and
//! come in through their traits; the board spawns its own capture task around
//! [`BroadcastPipeline`](crate::stream::BroadcastPipeline).

mod http;
mod radio;
mod storage;

use embassy_executor::Spawner;
use embassy_net::{
    Ipv4Address, Ipv4Cidr, Runner, Stack, StackResources, StaticConfigV4,
};
use esp_hal::{rng::Rng, timer::timg::TimerGroup};
use esp_radio::wifi::{WifiController, WifiDevice};
use esp_storage::FlashStorage;
use static_cell::StaticCell;

pub use radio::{install_event_forwarders, watch_station_address, RadioLink};
pub use storage::{credential_store, FlashCredentialStore};

use crate::config::{compiled_wifi_credentials, ConnectivityPolicy};
use crate::connectivity::{ConnectivityManager, ConnectivityStatus, LinkEvents, SharedLink};
use crate::control::ControlState;
use crate::credentials::FlashKvStore;
use crate::discovery::{Discovery, ServiceAnnouncer};
use crate::error::{BootError, LinkError};
use crate::provisioning::{run_restart_timer, ProvisioningService, RestartSignal};
use crate::runtime::{bring_up, DeviceRole};
use crate::telemetry::Telemetry;

pub static TELEMETRY: Telemetry = Telemetry::new();
pub static LINK_EVENTS: LinkEvents = LinkEvents::new();
pub static STATUS: ConnectivityStatus = ConnectivityStatus::new();
pub static RESTART: RestartSignal = RestartSignal::new();
/// Read by the actuator side.
pub static CONTROL: ControlState<'static> = ControlState::new(&TELEMETRY);

pub type EspProvisioning =
    ProvisioningService<'static, RadioLink, FlashKvStore<FlashStorage<'static>>>;

/// Internal RAM heap for frame buffers and the radio driver.
const HEAP_BYTES: usize = 96 * 1024;

const AP_ADDRESS: Ipv4Address = Ipv4Address::new(192, 168, 4, 1);
const AP_PREFIX_LEN: u8 = 24;

pub fn init_logging() {
    esp_println::logger::init_logger(log::LevelFilter::Info);
}

/// Heap plus the RTOS tick. Must run before [`setup_network`].
pub fn init_runtime(timg0: esp_hal::peripherals::TIMG0<'static>) {
    esp_alloc::heap_allocator!(size: HEAP_BYTES);
    let timg0 = TimerGroup::new(timg0);
    esp_rtos::start(timg0.timer0);
}

pub struct NetworkHandles {
    pub controller: WifiController<'static>,
    pub mac: [u8; 6],
    pub sta_stack: Stack<'static>,
    pub sta_runner: Runner<'static, WifiDevice<'static>>,
    pub ap_stack: Stack<'static>,
    pub ap_runner: Runner<'static, WifiDevice<'static>>,
}

/// Radio driver plus one network stack per interface: DHCP client on the
/// station side, fixed address on the access point side.
pub fn setup_network(wifi: esp_hal::peripherals::WIFI<'static>) -> Result<NetworkHandles, BootError> {
    static RADIO_CTRL: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static STA_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
    static AP_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();

    let radio_ctrl = esp_radio::init().map_err(|err| {
        log::error!("wifi: esp_radio::init err={:?}", err);
        BootError::RadioInit(LinkError::NotInitialized)
    })?;
    let radio_ctrl = RADIO_CTRL.init(radio_ctrl);
    let (controller, ifaces) = esp_radio::wifi::new(radio_ctrl, wifi, radio::wifi_runtime_config())
        .map_err(|err| BootError::RadioInit(radio::link_error(err)))?;
    let mac = ifaces.sta.mac_address();

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    let (sta_stack, sta_runner) = embassy_net::new(
        ifaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        STA_RESOURCES.init(StackResources::<3>::new()),
        seed,
    );
    let (ap_stack, ap_runner) = embassy_net::new(
        ifaces.ap,
        embassy_net::Config::ipv4_static(StaticConfigV4 {
            address: Ipv4Cidr::new(AP_ADDRESS, AP_PREFIX_LEN),
            gateway: Some(AP_ADDRESS),
            dns_servers: Default::default(),
        }),
        AP_RESOURCES.init(StackResources::<3>::new()),
        seed.rotate_left(17),
    );

    Ok(NetworkHandles {
        controller,
        mac,
        sta_stack,
        sta_runner,
        ap_stack,
        ap_runner,
    })
}

pub struct Started<A> {
    pub role: DeviceRole,
    pub discovery: Discovery<A>,
}

/// Full network bring-up. Spawns the stack runners, the address watcher, the
/// restart timer, the connectivity event loop and, in the provisioning role,
/// the portal server.
pub async fn start<A: ServiceAnnouncer>(
    spawner: Spawner,
    wifi: esp_hal::peripherals::WIFI<'static>,
    flash: esp_hal::peripherals::FLASH<'static>,
    announcer: A,
) -> Result<Started<A>, BootError> {
    static LINK: StaticCell<SharedLink<RadioLink>> = StaticCell::new();
    static SERVICE: StaticCell<EspProvisioning> = StaticCell::new();

    let net = setup_network(wifi)?;
    install_event_forwarders(&LINK_EVENTS);
    spawner.must_spawn(net_task(net.sta_runner));
    spawner.must_spawn(net_task(net.ap_runner));
    spawner.must_spawn(station_address_task(net.sta_stack));
    spawner.must_spawn(restart_task());

    let link: &'static SharedLink<RadioLink> =
        LINK.init(SharedLink::new(RadioLink::new(net.controller, net.mac)));
    let mut store = credential_store(flash);
    let mut manager = ConnectivityManager::new(
        link,
        &LINK_EVENTS,
        &STATUS,
        &CONTROL,
        &TELEMETRY,
        ConnectivityPolicy::defaults().sanitized(),
    );
    let mut discovery = Discovery::new(announcer);

    let role = bring_up(
        &mut manager,
        &mut store,
        compiled_wifi_credentials(),
        &mut discovery,
    )
    .await?;

    if role.serves_provisioning() {
        let service = SERVICE.init(ProvisioningService::new(link, store, &RESTART, &TELEMETRY));
        spawner.must_spawn(provisioning_http_task(net.ap_stack, service));
    }
    spawner.must_spawn(connectivity_task(manager));

    Ok(Started { role, discovery })
}

fn software_reset() {
    esp_hal::system::software_reset()
}

#[embassy_executor::task(pool_size = 2)]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

#[embassy_executor::task]
async fn station_address_task(stack: Stack<'static>) {
    watch_station_address(stack, &LINK_EVENTS).await
}

#[embassy_executor::task]
async fn provisioning_http_task(stack: Stack<'static>, service: &'static EspProvisioning) {
    http::run_provisioning_server(stack, service).await
}

#[embassy_executor::task]
async fn restart_task() {
    run_restart_timer(&RESTART, software_reset).await;
}

#[embassy_executor::task]
async fn connectivity_task(mut manager: ConnectivityManager<'static, RadioLink>) {
    if let Err(err) = manager.run().await {
        log::error!("wifi: {}, restarting", err);
        software_reset();
    }
}
