use embassy_net::{tcp::TcpSocket, IpListenEndpoint, Stack};
use embassy_time::{with_timeout, Duration};
use static_cell::StaticCell;

use super::EspProvisioning;
use crate::config::PROVISION_PORT;
use crate::provisioning::{handle_connection, HEADER_BUF_LEN};

const HTTP_RW_BUF: usize = 2048;
const SOCKET_TIMEOUT_SECS: u64 = 20;

/// Accept loop of the provisioning portal, one connection at a time.
pub(super) async fn run_provisioning_server(
    stack: Stack<'static>,
    service: &'static EspProvisioning,
) -> ! {
    static RX_BUFFER: StaticCell<[u8; HTTP_RW_BUF]> = StaticCell::new();
    static TX_BUFFER: StaticCell<[u8; HTTP_RW_BUF]> = StaticCell::new();
    static HEADER_BUFFER: StaticCell<[u8; HEADER_BUF_LEN]> = StaticCell::new();

    let rx_buffer = RX_BUFFER.init([0u8; HTTP_RW_BUF]);
    let tx_buffer = TX_BUFFER.init([0u8; HTTP_RW_BUF]);
    let header_buffer = HEADER_BUFFER.init([0u8; HEADER_BUF_LEN]);

    stack.wait_config_up().await;
    if let Some(cfg) = stack.config_v4() {
        log::info!(
            "provision: listening on {}:{}",
            cfg.address.address(),
            PROVISION_PORT
        );
    }

    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buffer[..], &mut tx_buffer[..]);
        socket.set_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)));

        if let Err(err) = socket
            .accept(IpListenEndpoint {
                addr: None,
                port: PROVISION_PORT,
            })
            .await
        {
            log::warn!("provision: accept err={:?}", err);
            continue;
        }

        match handle_connection(&mut socket, service, &mut header_buffer[..]).await {
            Ok(status) => log::debug!("provision: served status={}", status),
            Err(err) => log::info!("provision: rejected status={} body={}", err.status, err.body),
        }

        let _ = with_timeout(Duration::from_millis(250), socket.flush()).await;
        socket.close();
    }
}
