//! mDNS announcement of the stream and provisioning endpoints.
//!
//! Each registration is attempted until it succeeds once, then never again
//! for the rest of the boot.

use crate::config::{MDNS_HOSTNAME, MDNS_INSTANCE};
use crate::error::AnnounceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceSpec {
    pub service_type: &'static str,
    pub proto: &'static str,
    pub port: u16,
    pub txt: &'static [(&'static str, &'static str)],
}

const STREAM_TXT: &[(&str, &str)] = &[("path", "/"), ("proto", "ws")];
const PROVISION_TXT: &[(&str, &str)] = &[("path", "/"), ("role", "provision")];

pub const fn stream_service(port: u16) -> ServiceSpec {
    ServiceSpec {
        service_type: "_esp_rc",
        proto: "_tcp",
        port,
        txt: STREAM_TXT,
    }
}

/// Older clients browse for this name.
pub const fn stream_alias_service(port: u16) -> ServiceSpec {
    ServiceSpec {
        service_type: "_rcws",
        proto: "_tcp",
        port,
        txt: STREAM_TXT,
    }
}

pub const fn provisioning_service(port: u16) -> ServiceSpec {
    ServiceSpec {
        service_type: "_http",
        proto: "_tcp",
        port,
        txt: PROVISION_TXT,
    }
}

/// mDNS responder.
pub trait ServiceAnnouncer {
    fn start(&mut self, hostname: &str, instance: &str) -> Result<(), AnnounceError>;
    fn register(&mut self, service: &ServiceSpec) -> Result<(), AnnounceError>;
}

pub struct Discovery<A> {
    announcer: A,
    started: bool,
    stream: bool,
    stream_alias: bool,
    provisioning: bool,
}

impl<A: ServiceAnnouncer> Discovery<A> {
    pub fn new(announcer: A) -> Self {
        Self {
            announcer,
            started: false,
            stream: false,
            stream_alias: false,
            provisioning: false,
        }
    }

    pub fn announcer(&self) -> &A {
        &self.announcer
    }

    pub fn ensure_started(&mut self) -> Result<(), AnnounceError> {
        if self.started {
            return Ok(());
        }
        self.announcer.start(MDNS_HOSTNAME, MDNS_INSTANCE)?;
        self.started = true;
        log::info!(
            "discovery: responder up hostname={} instance={}",
            MDNS_HOSTNAME,
            MDNS_INSTANCE
        );
        Ok(())
    }

    /// Primary and alias stream services. Both are tried even if the first
    /// fails.
    pub fn announce_stream(&mut self, port: u16) -> Result<(), AnnounceError> {
        self.ensure_started()?;
        let primary = register_once(
            &mut self.announcer,
            &mut self.stream,
            &stream_service(port),
        );
        let alias = register_once(
            &mut self.announcer,
            &mut self.stream_alias,
            &stream_alias_service(port),
        );
        primary.and(alias)
    }

    pub fn announce_provisioning(&mut self, port: u16) -> Result<(), AnnounceError> {
        self.ensure_started()?;
        register_once(
            &mut self.announcer,
            &mut self.provisioning,
            &provisioning_service(port),
        )
    }
}

fn register_once<A: ServiceAnnouncer>(
    announcer: &mut A,
    done: &mut bool,
    service: &ServiceSpec,
) -> Result<(), AnnounceError> {
    if *done {
        return Ok(());
    }
    match announcer.register(service) {
        Ok(()) => {
            *done = true;
            log::info!(
                "discovery: registered {}.{} port={}",
                service.service_type,
                service.proto,
                service.port
            );
            Ok(())
        }
        Err(err) => {
            log::warn!(
                "discovery: register {}.{} failed err={}",
                service.service_type,
                service.proto,
                err
            );
            Err(err)
        }
    }
}
