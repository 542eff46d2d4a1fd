use flume::Sender;

/// Notifications for whatever front end drives the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Transient status line, shown for roughly `duration_ms`.
    Status { text: String, duration_ms: u32 },
    /// An error the user has to act on.
    Critical { title: String, text: String },
    ReencryptionStarted,
    ReencryptionFinished,
    /// Content of the entry most recently decrypted during re-encryption.
    LastDecrypted(String),
}

/// Publishes [`StoreEvent`]s when a subscriber is attached.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<StoreEvent>>,
}

impl EventSink {
    pub fn new(tx: Sender<StoreEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops everything.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: StoreEvent) {
        if let Some(tx) = &self.tx {
            // A dropped receiver just means nobody is listening anymore.
            let _ = tx.send(event);
        }
    }

    pub fn status(&self, text: impl Into<String>, duration_ms: u32) {
        let text = text.into();
        tracing::info!("{text}");
        self.emit(StoreEvent::Status { text, duration_ms });
    }

    pub fn critical(&self, title: impl Into<String>, text: impl Into<String>) {
        let title = title.into();
        let text = text.into();
        tracing::error!("{title}: {text}");
        self.emit(StoreEvent::Critical { title, text });
    }
}
