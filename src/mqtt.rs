use anyhow::{Context, Result};
use rumqttc::{Client, Connection, LastWill, MqttOptions, QoS};
use serde::Deserialize;
use std::time::Duration;

/// Queued requests while the broker is unreachable; one cycle of a full
/// 16 battery stack in simple format needs about 165.
const REQUEST_CAPACITY: usize = 256;

#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    host: String,
    #[serde(default = "MqttConfig::default_port")]
    port: u16,
    username: Option<String>,
    password: Option<String>,
    #[serde(default = "MqttConfig::default_topic")]
    topic: String,
    #[serde(default = "MqttConfig::default_qos")]
    qos: u8,
    #[serde(default = "MqttConfig::default_retain")]
    retain: bool,
    #[serde(default = "MqttConfig::default_client_id")]
    client_id: String,
    #[serde(default = "MqttConfig::default_keep_alive_secs")]
    keep_alive_secs: u64,
}

impl MqttConfig {
    fn default_port() -> u16 {
        1883
    }

    fn default_topic() -> String {
        "pytesbms".into()
    }

    fn default_qos() -> u8 {
        0
    }

    fn default_retain() -> bool {
        false
    }

    fn generate_random_string(len: usize) -> String {
        use rand::distributions::Alphanumeric;
        use rand::Rng;

        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    fn default_client_id() -> String {
        format!("pytesbms-{}", Self::generate_random_string(8))
    }

    fn default_keep_alive_secs() -> u64 {
        30
    }

    pub const DEFAULT_CONFIG_FILE: &str = "mqtt.yaml";

    pub fn load(config_file_path: &str) -> Result<Self> {
        log::debug!("Loading config file from {config_file_path:?}");
        let config_file = std::fs::File::open(config_file_path)
            .with_context(|| format!("Cannot open MQTT config file {config_file_path:?}"))?;
        let config: Self = serde_yaml::from_reader(&config_file)
            .with_context(|| format!("Cannot read MQTT config from file: {config_file_path:?}"))?;
        Ok(config)
    }

    fn qos(&self) -> Result<QoS> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => anyhow::bail!("Invalid MQTT QoS {other}, expected 0, 1 or 2"),
        }
    }

    fn availability_topic(&self) -> String {
        format!("{}/availability", self.topic)
    }

    fn create_client(&self) -> Result<(Client, Connection)> {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs));
        options.set_clean_session(true);
        options.set_last_will(LastWill::new(
            self.availability_topic(),
            "offline",
            QoS::AtLeastOnce,
            true,
        ));
        if let (Some(u), Some(p)) = (&self.username, &self.password) {
            options.set_credentials(u, p);
        }

        log::info!(
            "Connecting to MQTT broker {}:{} with client_id: {}",
            self.host,
            self.port,
            self.client_id
        );
        Ok(Client::new(options, REQUEST_CAPACITY))
    }
}

pub struct MqttPublisher {
    client: Client,
    config: MqttConfig,
    qos: QoS,
}

impl MqttPublisher {
    pub fn new(config: MqttConfig) -> Result<Self> {
        let qos = config.qos()?;
        let (client, connection) = config.create_client()?;
        let availability = (client.clone(), config.availability_topic());
        std::thread::Builder::new()
            .name("mqtt-eventloop".into())
            .spawn(move || drive_connection(connection, availability))
            .with_context(|| "Cannot spawn MQTT event loop thread")?;
        Ok(Self { client, config, qos })
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    pub fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        log::debug!(
            "Publishing to MQTT: Topic='{}', Payload='{payload}', QoS={:?}",
            topic,
            self.qos
        );

        self.client
            .try_publish(topic, self.qos, self.config.retain, payload)
            .with_context(|| format!("Failed to publish message to MQTT topic: {}", topic))?;

        Ok(())
    }
}

/// Replaces the retained last-will `offline` with `online`. Must not block,
/// it runs on the event loop thread that drains the request queue.
fn announce_online(client: &Client, availability_topic: &str) -> Result<()> {
    client
        .try_publish(availability_topic, QoS::AtLeastOnce, true, "online")
        .with_context(|| "Failed to publish availability")?;
    Ok(())
}

/// Runs the rumqttc event loop, which handles (re)connects and outgoing
/// packets. Errors are logged and retried after a short pause.
fn drive_connection(mut connection: Connection, availability: (Client, String)) {
    let (client, availability_topic) = availability;
    for notification in connection.iter() {
        match notification {
            Ok(rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(ack))) => {
                log::info!("Connected to MQTT broker: {:?}", ack.code);
                if let Err(e) = announce_online(&client, &availability_topic) {
                    log::error!("{e:#}");
                }
            }
            Ok(event) => log::trace!("MQTT event: {event:?}"),
            Err(e) => {
                log::warn!("MQTT connection error: {e}, reconnecting");
                std::thread::sleep(Duration::from_secs(5));
            }
        }
    }
}
