//! A single flow's FIFO, deficit counter, list linkage, and CoDel state.

use std::collections::VecDeque;

use crate::qdisc::codel::CodelState;
use crate::qdisc::packet::PacketHandle;

/// Which rotation list (if any) a flow is currently linked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListLink {
    None,
    New,
    Old,
}

pub(crate) struct FlowRecord<P> {
    pub fifo: VecDeque<P>,
    pub deficit: i64,
    pub drop_count: u64,
    pub link: ListLink,
    pub prev: Option<u32>,
    pub next: Option<u32>,
    pub codel: CodelState,
    /// The cuckoo bucket pair computed for this flow's identity the last
    /// time it was classified. Cleanup on flow-emptying uses these stored
    /// values rather than recomputing from whatever packet happened to be
    /// dequeued last, which is only correct if that packet is still the one
    /// that established the flow's buckets.
    pub h0: u32,
    pub h1: u32,
}

impl<P> FlowRecord<P> {
    pub(crate) fn new() -> Self {
        Self {
            fifo: VecDeque::new(),
            deficit: 0,
            drop_count: 0,
            link: ListLink::None,
            prev: None,
            next: None,
            codel: CodelState::default(),
            h0: 0,
            h1: 0,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.fifo.clear();
        self.deficit = 0;
        self.drop_count = 0;
        self.link = ListLink::None;
        self.prev = None;
        self.next = None;
        self.codel = CodelState::default();
        self.h0 = 0;
        self.h1 = 0;
    }
}

impl<P: PacketHandle> FlowRecord<P> {
    pub(crate) fn head_flow_hash(&self) -> Option<u32> {
        self.fifo.front().map(|p| p.flow_hash())
    }
}

/// A doubly-linked list of flow slot indices, threaded through the flow
/// records themselves so no separate node allocation is needed.
#[derive(Debug, Default)]
pub(crate) struct FlowList {
    pub head: Option<u32>,
    pub tail: Option<u32>,
}

impl FlowList {
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

pub(crate) fn list_push_back<P>(
    list: &mut FlowList,
    flows: &mut [FlowRecord<P>],
    slot: u32,
    kind: ListLink,
) {
    flows[slot as usize].link = kind;
    flows[slot as usize].prev = list.tail;
    flows[slot as usize].next = None;
    match list.tail {
        Some(tail) => flows[tail as usize].next = Some(slot),
        None => list.head = Some(slot),
    }
    list.tail = Some(slot);
}

pub(crate) fn list_detach<P>(list: &mut FlowList, flows: &mut [FlowRecord<P>], slot: u32) {
    let prev = flows[slot as usize].prev;
    let next = flows[slot as usize].next;
    match prev {
        Some(p) => flows[p as usize].next = next,
        None => list.head = next,
    }
    match next {
        Some(n) => flows[n as usize].prev = prev,
        None => list.tail = prev,
    }
    flows[slot as usize].prev = None;
    flows[slot as usize].next = None;
    flows[slot as usize].link = ListLink::None;
}
