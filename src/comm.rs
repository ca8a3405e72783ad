//! Collective communication over a simulated process group.
//!
//! The clustering engine only talks to its runtime through the
//! [`Communicator`] trait: a sum-reduction toward a root rank, a broadcast
//! away from it, and a barrier used to align timing measurements. The
//! in-process implementation runs one OS thread per worker, each owning a
//! mailbox of sequence-tagged packets, so the same engine code can run
//! against a real multi-process transport later.
//!
//! The group makes no attempt to detect a dead peer: a worker that stops
//! participating stalls everyone at the next collective, mirroring the
//! no-fault-tolerance contract of the overall design.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use crate::error::{Error, Result};

/// Collective operations available identically to every worker.
///
/// The group is SPMD: every worker issues the same sequence of collectives
/// with compatible arguments (same vector lengths, same root). Reductions
/// materialize a result only at the root; broadcasts and barriers return
/// on every rank once all participants have arrived.
pub trait Communicator {
    /// This worker's rank within the group, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of workers in the group.
    fn size(&self) -> usize;

    /// Element-wise sum of every worker's `local` vector, delivered to
    /// `root` only; all other ranks observe `None`.
    fn reduce_sum_f32(&mut self, local: &[f32], root: usize) -> Result<Option<Vec<f32>>>;

    /// Counterpart of [`Communicator::reduce_sum_f32`] for member counts.
    fn reduce_sum_u64(&mut self, local: &[u64], root: usize) -> Result<Option<Vec<u64>>>;

    /// Distributes a vector from `root` to the whole group. The root
    /// passes `Some`, every other rank passes `None`; all ranks return
    /// the root's data.
    fn broadcast_f32(&mut self, data: Option<Vec<f32>>, root: usize) -> Result<Vec<f32>>;

    /// Blocks until every worker in the group has arrived.
    fn barrier(&mut self) -> Result<()>;
}

enum Payload {
    F32(Vec<f32>),
    U64(Vec<u64>),
    Token,
}

struct Packet {
    seq: u64,
    payload: Payload,
}

/// Channel-backed communicator handed to each worker of a [`ProcessGroup`].
pub struct ChannelCommunicator {
    rank: usize,
    peers: Vec<Sender<Packet>>,
    inbox: Receiver<Packet>,
    /// Collective sequence number; identical across ranks because every
    /// worker issues the same collectives in the same order.
    seq: u64,
    /// Packets that arrived ahead of the collective currently draining.
    stash: Vec<Packet>,
}

impl ChannelCommunicator {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn send(&self, to: usize, packet: Packet) -> Result<()> {
        self.peers[to]
            .send(packet)
            .map_err(|_| Error::PeerDisconnected)
    }

    /// Receives the next packet tagged `seq`, stashing packets that belong
    /// to a later collective. Back-to-back root-bound collectives can
    /// interleave across senders; the tag keeps them apart.
    fn recv_seq(&mut self, seq: u64) -> Result<Payload> {
        if let Some(pos) = self.stash.iter().position(|packet| packet.seq == seq) {
            return Ok(self.stash.swap_remove(pos).payload);
        }
        loop {
            let packet = self.inbox.recv().map_err(|_| Error::PeerDisconnected)?;
            if packet.seq == seq {
                return Ok(packet.payload);
            }
            self.stash.push(packet);
        }
    }
}

impl Communicator for ChannelCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn reduce_sum_f32(&mut self, local: &[f32], root: usize) -> Result<Option<Vec<f32>>> {
        let seq = self.next_seq();
        if self.rank != root {
            self.send(
                root,
                Packet {
                    seq,
                    payload: Payload::F32(local.to_vec()),
                },
            )?;
            return Ok(None);
        }

        let mut totals = local.to_vec();
        for _ in 1..self.size() {
            match self.recv_seq(seq)? {
                Payload::F32(values) if values.len() == totals.len() => {
                    for (total, value) in totals.iter_mut().zip(values) {
                        *total += value;
                    }
                }
                _ => return Err(Error::CollectiveMismatch("reduce_sum_f32")),
            }
        }
        Ok(Some(totals))
    }

    fn reduce_sum_u64(&mut self, local: &[u64], root: usize) -> Result<Option<Vec<u64>>> {
        let seq = self.next_seq();
        if self.rank != root {
            self.send(
                root,
                Packet {
                    seq,
                    payload: Payload::U64(local.to_vec()),
                },
            )?;
            return Ok(None);
        }

        let mut totals = local.to_vec();
        for _ in 1..self.size() {
            match self.recv_seq(seq)? {
                Payload::U64(values) if values.len() == totals.len() => {
                    for (total, value) in totals.iter_mut().zip(values) {
                        *total += value;
                    }
                }
                _ => return Err(Error::CollectiveMismatch("reduce_sum_u64")),
            }
        }
        Ok(Some(totals))
    }

    fn broadcast_f32(&mut self, data: Option<Vec<f32>>, root: usize) -> Result<Vec<f32>> {
        let seq = self.next_seq();
        if self.rank == root {
            let values = data.ok_or(Error::CollectiveMismatch("broadcast_f32"))?;
            for peer in 0..self.size() {
                if peer != self.rank {
                    self.send(
                        peer,
                        Packet {
                            seq,
                            payload: Payload::F32(values.clone()),
                        },
                    )?;
                }
            }
            Ok(values)
        } else {
            match self.recv_seq(seq)? {
                Payload::F32(values) => Ok(values),
                _ => Err(Error::CollectiveMismatch("broadcast_f32")),
            }
        }
    }

    fn barrier(&mut self) -> Result<()> {
        let seq = self.next_seq();
        // Rank 0 is the rendezvous point regardless of collective roots.
        if self.rank == 0 {
            for _ in 1..self.size() {
                match self.recv_seq(seq)? {
                    Payload::Token => {}
                    _ => return Err(Error::CollectiveMismatch("barrier")),
                }
            }
            for peer in 1..self.size() {
                self.send(
                    peer,
                    Packet {
                        seq,
                        payload: Payload::Token,
                    },
                )?;
            }
            Ok(())
        } else {
            self.send(
                0,
                Packet {
                    seq,
                    payload: Payload::Token,
                },
            )?;
            match self.recv_seq(seq)? {
                Payload::Token => Ok(()),
                _ => Err(Error::CollectiveMismatch("barrier")),
            }
        }
    }
}

/// Fixed-size group of SPMD workers backed by OS threads.
///
/// The size is decided once at construction; there is no dynamic join or
/// leave. [`ProcessGroup::run`] executes the identical closure on every
/// rank and returns the per-worker results in rank order.
pub struct ProcessGroup {
    size: usize,
}

impl ProcessGroup {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::EmptyGroup);
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs `f` concurrently on every rank of the group.
    pub fn run<T, F>(&self, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(ChannelCommunicator) -> Result<T> + Send + Sync,
    {
        let (senders, inboxes): (Vec<Sender<Packet>>, Vec<Receiver<Packet>>) =
            (0..self.size).map(|_| channel()).unzip();

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.size);
            for (rank, inbox) in inboxes.into_iter().enumerate() {
                let comm = ChannelCommunicator {
                    rank,
                    peers: senders.clone(),
                    inbox,
                    seq: 0,
                    stash: Vec::new(),
                };
                let f = &f;
                handles.push(scope.spawn(move || f(comm)));
            }
            // Workers own their sender clones; once a worker returns, its
            // peers must be able to observe the disconnect.
            drop(senders);

            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle.join().map_err(|_| Error::WorkerPanicked { rank })?
                })
                .collect()
        })
    }
}
