use crate::publish::SampleSink;
use crate::sample::Sample;
use crate::transport::{CoapTransport, Resource};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Transport double that answers from a fixed table and records the order
/// of requests. Unknown resources answer with empty text, like a failed
/// client invocation.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: HashMap<Resource, String>,
    calls: Mutex<Vec<Resource>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, resource: Resource, body: &str) -> Self {
        self.responses.insert(resource, body.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Resource> {
        self.calls.lock().unwrap().clone()
    }
}

impl CoapTransport for ScriptedTransport {
    async fn fetch(&self, resource: Resource) -> String {
        self.calls.lock().unwrap().push(resource);
        self.responses.get(&resource).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub enum SinkBehavior {
    Accept(String),
    Reject,
    Panic,
}

/// Sink double: records every sample it is handed and replies following a
/// script, accepting with sequential ids once the script runs out.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    published: Arc<Mutex<Vec<Sample>>>,
    script: Arc<Mutex<VecDeque<SinkBehavior>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(behaviors: impl IntoIterator<Item = SinkBehavior>) -> Self {
        let sink = Self::default();
        sink.script.lock().unwrap().extend(behaviors);
        sink
    }

    pub fn published(&self) -> Vec<Sample> {
        self.published.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

impl SampleSink for RecordingSink {
    async fn publish(&self, sample: &Sample) -> Option<String> {
        let entry = {
            let mut published = self.published.lock().unwrap();
            published.push(*sample);
            published.len()
        };
        let behavior = self.script.lock().unwrap().pop_front();
        match behavior {
            Some(SinkBehavior::Accept(id)) => Some(id),
            Some(SinkBehavior::Reject) => None,
            Some(SinkBehavior::Panic) => panic!("sink exploded"),
            None => Some(entry.to_string()),
        }
    }
}
