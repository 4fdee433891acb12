//! FileSink - appends messages to disk as JSON Lines

use contracts::{ContractError, Message, MessageSink};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// Output file name inside `base_path`
    pub file_name: String,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./outbox"));

        let file_name = params
            .get("file_name")
            .cloned()
            .unwrap_or_else(|| "messages.jsonl".to_string());

        Self {
            base_path,
            file_name,
        }
    }

    /// Full path of the output file
    pub fn path(&self) -> PathBuf {
        self.base_path.join(&self.file_name)
    }
}

/// Sink that writes one JSON line per message
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        // Create base directory if it doesn't exist
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: None,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    fn append(&mut self, msg: &Message) -> std::io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "file sink not started")
        })?;
        serde_json::to_writer(&mut *writer, msg)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    fn persist_message(&mut self, msg: &Message) -> Result<(), ContractError> {
        self.append(msg).map_err(|e| {
            error!(sink = %self.name, message_id = %msg.id, error = %e, "Write failed");
            ContractError::sink_send(&self.name, e.to_string())
        })
    }
}

impl MessageSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_sink_start", skip(self), fields(sink = %self.name))]
    async fn start(&mut self) -> Result<(), ContractError> {
        let path = self.config.path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ContractError::sink_start(&self.name, format!("{}: {e}", path.display())))?;
        self.writer = Some(BufWriter::new(file));
        debug!(sink = %self.name, path = %path.display(), "FileSink opened");
        Ok(())
    }

    async fn signal_stop(&mut self) {}

    #[instrument(name = "file_sink_stop", skip(self), fields(sink = %self.name))]
    async fn wait_for_complete_stop(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_stop(&self.name, e.to_string()))?;
        }
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }

    #[instrument(
        name = "file_sink_send",
        skip(self, msg),
        fields(sink = %self.name, message_id = %msg.id)
    )]
    async fn send_msg(&mut self, msg: &Message) -> Result<bool, ContractError> {
        self.persist_message(msg)?;
        Ok(true)
    }
}
