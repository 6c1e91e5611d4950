use crate::mqtt::MqttPublisher;
use log::{error, info};
use pytesbms_lib::publish::{Channel, Publisher, Reading, Target};
use serde_json::json;

/// Collects the readings of a cycle and prints them as a block.
#[derive(Debug, Default)]
pub struct ConsolePublisher {
    lines: Vec<String>,
    timestamps: bool,
}

impl ConsolePublisher {
    pub fn new(timestamps: bool) -> Self {
        Self {
            lines: Vec::new(),
            timestamps,
        }
    }
}

impl Publisher for ConsolePublisher {
    fn publish(&mut self, target: Target, channel: Channel, reading: Reading<'_>) {
        self.lines.push(format!("{target}/{channel}: {reading}"));
    }

    fn end_cycle(&mut self) {
        if self.timestamps {
            println!("--- Data at {} ---", chrono::Local::now().to_rfc3339());
        }
        for line in self.lines.drain(..) {
            println!("{line}");
        }
        if self.timestamps {
            println!("--------------------------");
        }
    }
}

/// Publishes every reading to `<topic>/<target>/<channel>`.
pub struct MqttSimplePublisher {
    publisher: MqttPublisher,
}

impl MqttSimplePublisher {
    pub fn new(publisher: MqttPublisher) -> Self {
        Self { publisher }
    }
}

impl Publisher for MqttSimplePublisher {
    fn publish(&mut self, target: Target, channel: Channel, reading: Reading<'_>) {
        let topic = format!("{}/{target}/{channel}", self.publisher.topic());
        if let Err(e) = self.publisher.publish(&topic, &reading.to_string()) {
            error!("Failed to publish message to topic {topic}: {e}");
        }
    }
}

/// Builds one JSON document per cycle and publishes it to `<topic>`.
pub struct MqttJsonPublisher {
    publisher: MqttPublisher,
    document: serde_json::Map<String, serde_json::Value>,
}

impl MqttJsonPublisher {
    pub fn new(publisher: MqttPublisher) -> Self {
        Self {
            publisher,
            document: serde_json::Map::new(),
        }
    }
}

fn reading_to_json(reading: Reading<'_>) -> serde_json::Value {
    match reading {
        Reading::Number(n) => json!(n),
        Reading::Text(s) => json!(s),
    }
}

impl Publisher for MqttJsonPublisher {
    fn publish(&mut self, target: Target, channel: Channel, reading: Reading<'_>) {
        let entry = self
            .document
            .entry(target.to_string())
            .or_insert_with(|| json!({}));
        if let Some(object) = entry.as_object_mut() {
            object.insert(channel.to_string(), reading_to_json(reading));
        }
    }

    fn end_cycle(&mut self) {
        if self.document.is_empty() {
            info!("No data fetched in this cycle to publish via MQTT.");
            return;
        }
        let mut document = std::mem::take(&mut self.document);
        document.insert(
            "timestamp".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );
        match serde_json::to_string(&document) {
            Ok(json_payload) => {
                if let Err(e) = self.publisher.publish(self.publisher.topic(), &json_payload) {
                    error!("Failed to publish data to MQTT: {e:?}");
                }
            }
            Err(e) => error!("Failed to serialize data to JSON string: {e}"),
        }
    }
}
