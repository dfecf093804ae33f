//! Pub/sub broker client.
//!
//! Implements [`PublishPort`] for the outbound path.  The inbound path runs
//! in the client's own event callback: connection events update the shared
//! [`LinkStatus`], and messages are copied into the [`InboundQueue`] without
//! blocking.  Subscriptions are renewed by the publisher worker after every
//! (re)connect via [`MqttLink::ensure_subscribed`].
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`
//!   with a retained last-will on the status topic.  `mqtts://` brokers are
//!   verified against the pinned CA when one is configured, otherwise
//!   against the ESP-IDF certificate bundle.
//! - **all other targets**: an in-memory client that records publishes.

use log::{info, warn};

use crate::app::ports::{DeliveryLevel, MessageId, PublishPort};
use crate::config::{NetworkCredentials, TOPIC_CONTROL};
use crate::error::CommsError;
use crate::gateway::channels::{InboundQueue, LinkStatus};
use crate::gateway::commands::RemoteCommand;

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
};
#[cfg(target_os = "espidf")]
use esp_idf_svc::tls::X509;

/// Copy one broker message into the inbound queue.  Oversized or
/// non-UTF-8 messages are logged and dropped here.
pub fn on_message(topic: Option<&str>, data: &[u8], inbound: &InboundQueue) {
    let Some(topic) = topic else {
        warn!("MQTT: message without topic dropped");
        return;
    };
    match RemoteCommand::new(topic, data) {
        Ok(msg) => {
            inbound.push(msg);
        }
        Err(e) => warn!("MQTT: dropping message on '{}': {}", topic, e),
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct MqttLink {
    client: EspMqttClient<'static>,
}

#[cfg(target_os = "espidf")]
fn qos(level: DeliveryLevel) -> QoS {
    match level {
        DeliveryLevel::AtMostOnce => QoS::AtMostOnce,
        DeliveryLevel::AtLeastOnce => QoS::AtLeastOnce,
        DeliveryLevel::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// NUL-terminate the pinned CA.  The client reads the certificate on every
/// reconnect, so it lives for the rest of the boot.
#[cfg(target_os = "espidf")]
fn pinned_ca(pem: &str) -> Result<X509<'static>, CommsError> {
    let pem = std::ffi::CString::new(pem).map_err(|_| {
        warn!("MQTT: broker CA contains a NUL byte");
        CommsError::LinkDown
    })?;
    Ok(X509::pem(Box::leak(pem.into_boxed_c_str())))
}

#[cfg(target_os = "espidf")]
impl MqttLink {
    /// Start the client.  The connection itself completes asynchronously and
    /// is reported through `link`.
    pub fn connect(
        creds: &NetworkCredentials,
        link: &'static LinkStatus,
        inbound: &'static InboundQueue,
    ) -> Result<Self, CommsError> {
        use core::time::Duration;

        use crate::config::{BROKER_KEEP_ALIVE_SECS, TOPIC_STATUS};
        use crate::gateway::payload::OFFLINE_STATUS;

        let server_certificate = creds.broker_ca_pem.map(pinned_ca).transpose()?;
        let use_bundle = creds.uses_tls() && server_certificate.is_none();

        let conf = MqttClientConfiguration {
            client_id: Some(creds.client_id),
            username: creds.broker_user,
            password: creds.broker_password,
            keep_alive_interval: Some(Duration::from_secs(BROKER_KEEP_ALIVE_SECS)),
            lwt: Some(LwtConfiguration {
                topic: TOPIC_STATUS,
                payload: OFFLINE_STATUS.as_bytes(),
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            server_certificate,
            crt_bundle_attach: use_bundle.then_some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };

        let client = EspMqttClient::new_cb(creds.broker_uri, &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => {
                    info!("MQTT: connected");
                    link.set_broker(true);
                }
                EventPayload::Disconnected => {
                    warn!("MQTT: disconnected");
                    link.set_broker(false);
                }
                EventPayload::Received { topic, data, .. } => on_message(topic, data, inbound),
                EventPayload::Error(e) => warn!("MQTT: client error {:?}", e),
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT: client start failed: {}", e);
            CommsError::LinkDown
        })?;

        info!(
            "MQTT: client started for {}{}",
            creds.broker_uri,
            if creds.broker_ca_pem.is_some() { " (pinned CA)" } else { "" }
        );
        Ok(Self { client })
    }

    /// Subscribe to the control topic once per broker session.
    pub fn ensure_subscribed(&mut self, link: &LinkStatus) -> Result<(), CommsError> {
        if !link.take_subscribe_request() {
            return Ok(());
        }
        match self.client.subscribe(TOPIC_CONTROL, QoS::AtLeastOnce) {
            Ok(_) => {
                info!("MQTT: subscribed to {}", TOPIC_CONTROL);
                Ok(())
            }
            Err(e) => {
                warn!("MQTT: subscribe failed: {}", e);
                // Ask again on the next publisher cycle.
                link.set_broker(link.broker_up());
                Err(CommsError::MqttSubscribeFailed)
            }
        }
    }
}

#[cfg(target_os = "espidf")]
impl PublishPort for MqttLink {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        level: DeliveryLevel,
        retained: bool,
    ) -> Result<MessageId, CommsError> {
        self.client
            .publish(topic, qos(level), retained, payload)
            .map_err(|_| CommsError::MqttPublishFailed)
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

/// One recorded publish.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPublish {
    pub topic: String,
    pub payload: Vec<u8>,
    pub level: DeliveryLevel,
    pub retained: bool,
}

#[cfg(not(target_os = "espidf"))]
pub struct MqttLink {
    inbound: &'static InboundQueue,
    next_id: MessageId,
    subscribed: bool,
    published: Vec<SimPublish>,
}

#[cfg(not(target_os = "espidf"))]
impl MqttLink {
    /// Simulated session: the broker is reachable immediately.
    pub fn connect(
        creds: &NetworkCredentials,
        link: &'static LinkStatus,
        inbound: &'static InboundQueue,
    ) -> Result<Self, CommsError> {
        info!("MQTT(sim): connected to {}", creds.broker_uri);
        link.set_broker(true);
        Ok(Self { inbound, next_id: 0, subscribed: false, published: Vec::new() })
    }

    pub fn ensure_subscribed(&mut self, link: &LinkStatus) -> Result<(), CommsError> {
        if link.take_subscribe_request() {
            info!("MQTT(sim): subscribed to {}", TOPIC_CONTROL);
            self.subscribed = true;
        }
        Ok(())
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Deliver a message as if the broker forwarded it.
    pub fn inject(&self, topic: &str, data: &[u8]) {
        if self.subscribed && topic == TOPIC_CONTROL {
            on_message(Some(topic), data, self.inbound);
        }
    }

    pub fn published(&self) -> &[SimPublish] {
        &self.published
    }
}

#[cfg(not(target_os = "espidf"))]
impl PublishPort for MqttLink {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        level: DeliveryLevel,
        retained: bool,
    ) -> Result<MessageId, CommsError> {
        self.next_id = self.next_id.wrapping_add(1);
        self.published.push(SimPublish {
            topic: topic.into(),
            payload: payload.to_vec(),
            level,
            retained,
        });
        Ok(self.next_id)
    }
}
