//! TCP transport: one JSON message per line.
//!
//! The coordinator accepts a fixed number of worker connections up front.
//! Each connection gets a reader thread that forwards decoded messages into
//! one shared channel, so `recv` returns whichever worker answers first.

use super::{CoordinatorTransport, FromWorker, ToWorker, WorkerId, WorkerTransport};
use crate::ProtocolError;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::thread;

fn write_message<W: Write, M: Serialize>(writer: &mut W, message: &M) -> Result<(), ProtocolError> {
    serde_json::to_writer(&mut *writer, message)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn read_message<R: BufRead, M: DeserializeOwned>(reader: &mut R) -> Result<M, ProtocolError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(ProtocolError::Disconnected);
    }
    Ok(serde_json::from_str(&line)?)
}

pub struct TcpCoordinator {
    writers: Vec<BufWriter<TcpStream>>,
    inbound: Receiver<Result<FromWorker, ProtocolError>>,
}

impl TcpCoordinator {
    /// Blocks until `workers` connections were accepted. Worker ids follow
    /// the order of connection.
    pub fn accept(listener: &TcpListener, workers: usize) -> Result<Self, ProtocolError> {
        let (tx, inbound) = unbounded();
        let mut writers = Vec::with_capacity(workers);
        for id in 0..workers {
            let (stream, peer) = listener.accept()?;
            log::info!("worker {} connected from {}", WorkerId(id), peer);
            let reader = BufReader::new(stream.try_clone()?);
            let tx = tx.clone();
            thread::spawn(move || forward(reader, tx));
            writers.push(BufWriter::new(stream));
        }
        Ok(Self { writers, inbound })
    }
}

/// Decodes messages from one worker until it hangs up or sends garbage.
fn forward(mut reader: BufReader<TcpStream>, tx: Sender<Result<FromWorker, ProtocolError>>) {
    loop {
        let message = read_message(&mut reader);
        if let Err(ProtocolError::Disconnected) = message {
            break;
        }
        let failed = message.is_err();
        if tx.send(message).is_err() || failed {
            break;
        }
    }
}

impl CoordinatorTransport for TcpCoordinator {
    fn worker_count(&self) -> usize {
        self.writers.len()
    }

    fn send(&mut self, worker: WorkerId, message: ToWorker) -> Result<(), ProtocolError> {
        let writer = self
            .writers
            .get_mut(worker.0)
            .ok_or(ProtocolError::UnknownWorker(worker))?;
        write_message(writer, &message)
    }

    fn recv(&mut self) -> Result<FromWorker, ProtocolError> {
        self.inbound.recv().map_err(|_| ProtocolError::Disconnected)?
    }
}

pub struct TcpWorker {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl TcpWorker {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr)?;
        log::debug!("connected to coordinator at {}", stream.peer_addr()?);
        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }
}

impl WorkerTransport for TcpWorker {
    fn recv(&mut self) -> Result<ToWorker, ProtocolError> {
        read_message(&mut self.reader)
    }

    fn send(&mut self, message: FromWorker) -> Result<(), ProtocolError> {
        write_message(&mut self.writer, &message)
    }
}
