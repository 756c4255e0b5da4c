//! Thread-safe parser pool for tree-sitter parsers
//!
//! Tree-sitter parsers are not Sync, so each worker thread owns one parser
//! and requests reach the workers through a shared channel.

use anyhow::Result;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use tree_sitter::{Language, Parser, Tree};

/// Grammar used for a script file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    TypeScript,
    Tsx,
    /// Plain JavaScript, JSX included.
    JavaScript,
}

impl Grammar {
    /// Determine the grammar from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "ts" => Some(Grammar::TypeScript),
            "tsx" => Some(Grammar::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(Grammar::JavaScript),
            _ => None,
        }
    }

    /// Get the tree-sitter language for this grammar
    pub fn language(&self) -> Language {
        match self {
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

/// Internal message for the parser worker
struct WorkerRequest {
    grammar: Grammar,
    content: String,
    response_sender: Sender<Result<Tree>>,
}

/// Thread-safe parser pool
#[derive(Clone)]
pub struct ParserPool {
    sender: Sender<WorkerRequest>,
}

impl ParserPool {
    /// Create a new parser pool with the specified number of worker threads
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for i in 0..num_workers.max(1) {
            let receiver = Arc::clone(&receiver);
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    /// Worker thread function that processes parsing requests
    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<Receiver<WorkerRequest>>>) {
        tracing::debug!("Parser worker {} started", worker_id);

        let mut parser = Parser::new();
        let mut current: Option<Grammar> = None;

        loop {
            let next = {
                let guard = receiver.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                guard.recv()
            };
            let WorkerRequest {
                grammar,
                content,
                response_sender,
            } = match next {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!("Parser worker {} shutting down", worker_id);
                    break;
                }
            };

            if current != Some(grammar) {
                if let Err(e) = parser.set_language(&grammar.language()) {
                    let _ = response_sender.send(Err(anyhow::anyhow!("Failed to set language: {}", e)));
                    continue;
                }
                current = Some(grammar);
            }

            let result = parser
                .parse(&content, None)
                .ok_or_else(|| anyhow::anyhow!("Failed to parse content"));

            if response_sender.send(result).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }
    }

    /// Parse content, blocking the current thread until a worker answers.
    pub fn parse_blocking(&self, grammar: Grammar, content: &str) -> Result<Tree> {
        let (response_sender, response_receiver) = channel();

        let worker_request = WorkerRequest {
            grammar,
            content: content.to_string(),
            response_sender,
        };

        self.sender
            .send(worker_request)
            .map_err(|_| anyhow::anyhow!("Parser pool is shut down"))?;

        response_receiver
            .recv()
            .map_err(|_| anyhow::anyhow!("Parser worker died"))?
    }
}

/// Convenience function to create a parser pool with default settings
pub fn create_parser_pool() -> ParserPool {
    // Use number of CPU cores as default worker count, but at least 2
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);

    ParserPool::new(num_workers)
}
