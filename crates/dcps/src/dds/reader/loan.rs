// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Loaned sample buffer.
//!
//! Each reader owns one fixed-capacity buffer of (sample, info) slots. A
//! `take()` or `read()` fills it and hands it out as a [`SampleLoan`]; the
//! loan is returned when dropped (or explicitly with
//! [`SampleLoan::return_loan`]). At most one loan is outstanding per reader:
//! a second take while a loan is alive fails with `PreconditionNotMet`
//! instead of overwriting data the application still looks at.

use super::cache::SampleInfo;
use crate::dds::{Error, Result};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

fn reserve<E>(capacity: usize) -> Result<Vec<E>> {
    if capacity == 0 {
        return Err(Error::BadParameter("buffer capacity must be > 0".into()));
    }
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|_| Error::OutOfMemory)?;
    Ok(slots)
}

/// Fixed-capacity sequence of sample payloads.
///
/// Allocated once; filling never grows it past `capacity()`.
pub struct SampleSeq<T> {
    slots: Vec<Option<T>>,
    capacity: usize,
}

impl<T> SampleSeq<T> {
    /// Allocate room for `capacity` samples.
    ///
    /// Fails with `BadParameter` for a zero capacity and `OutOfMemory` if
    /// the allocation is refused.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            slots: reserve(capacity)?,
            capacity,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Fixed-capacity sequence of [`SampleInfo`] records, parallel to a
/// [`SampleSeq`].
pub struct SampleInfoSeq {
    infos: Vec<SampleInfo>,
    capacity: usize,
}

impl SampleInfoSeq {
    /// Allocate room for `capacity` infos.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            infos: reserve(capacity)?,
            capacity,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

pub(crate) struct LoanBuffer<T> {
    samples: SampleSeq<T>,
    infos: SampleInfoSeq,
}

impl<T> LoanBuffer<T> {
    pub(crate) fn new(samples: SampleSeq<T>, infos: SampleInfoSeq) -> Result<Self> {
        if samples.capacity() != infos.capacity() {
            return Err(Error::BadParameter(format!(
                "sample capacity {} != info capacity {}",
                samples.capacity(),
                infos.capacity()
            )));
        }
        Ok(Self { samples, infos })
    }

    pub(crate) fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(
            SampleSeq::with_capacity(capacity)?,
            SampleInfoSeq::with_capacity(capacity)?,
        )
    }

    pub(crate) fn capacity(&self) -> usize {
        self.samples.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.samples.slots.len()
    }

    /// Append one slot. Ignored once the buffer is full.
    pub(crate) fn push(&mut self, data: Option<T>, info: SampleInfo) {
        if self.len() >= self.capacity() {
            log::warn!("[reader] loan buffer full, slot dropped");
            return;
        }
        // A payload is only kept for valid_data slots.
        let data = if info.valid_data { data } else { None };
        self.samples.slots.push(data);
        self.infos.infos.push(info);
    }

    pub(crate) fn clear(&mut self) {
        self.samples.slots.clear();
        self.infos.infos.clear();
    }
}

/// Reader-owned storage for the loan buffer plus the outstanding-loan flag.
pub(crate) struct LoanSlot<T> {
    buffer: Mutex<Option<LoanBuffer<T>>>,
    loaned: AtomicBool,
    default_capacity: usize,
}

impl<T> LoanSlot<T> {
    pub(crate) fn new(default_capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(None),
            loaned: AtomicBool::new(false),
            default_capacity,
        }
    }

    /// Install the buffer; allowed once, before the first take.
    pub(crate) fn install(&self, buffer: LoanBuffer<T>) -> Result<()> {
        let mut slot = self.buffer.lock();
        if slot.is_some() {
            return Err(Error::PreconditionNotMet(
                "sample buffer already installed".into(),
            ));
        }
        *slot = Some(buffer);
        Ok(())
    }

    pub(crate) fn is_loaned(&self) -> bool {
        self.loaned.load(Ordering::Acquire)
    }

    /// Claim the buffer for a new loan, allocating the default buffer on
    /// first use. The returned guard holds an empty buffer.
    pub(crate) fn acquire(&self) -> Result<LoanClaim<'_, T>> {
        if self.loaned.swap(true, Ordering::AcqRel) {
            return Err(Error::PreconditionNotMet(
                "previous loan not returned".into(),
            ));
        }
        let mut guard = self.buffer.lock();
        if guard.is_none() {
            match LoanBuffer::with_capacity(self.default_capacity) {
                Ok(buffer) => *guard = Some(buffer),
                Err(e) => {
                    self.loaned.store(false, Ordering::Release);
                    return Err(e);
                }
            }
        }
        match MutexGuard::try_map(guard, |slot| slot.as_mut()) {
            Ok(buffer) => {
                let mut claim = LoanClaim {
                    buffer,
                    flag: &self.loaned,
                };
                claim.buffer.clear();
                Ok(claim)
            }
            Err(_) => {
                self.loaned.store(false, Ordering::Release);
                Err(Error::InvalidState("sample buffer missing".into()))
            }
        }
    }
}

/// Exclusive access to a reader's buffer between claim and loan return.
pub(crate) struct LoanClaim<'a, T> {
    buffer: MappedMutexGuard<'a, LoanBuffer<T>>,
    flag: &'a AtomicBool,
}

impl<'a, T> LoanClaim<'a, T> {
    pub(crate) fn buffer(&mut self) -> &mut LoanBuffer<T> {
        &mut self.buffer
    }

    /// Hand the filled buffer to the application, or release the claim if
    /// nothing was filled.
    pub(crate) fn into_loan(self) -> Option<SampleLoan<'a, T>> {
        if self.buffer.len() == 0 {
            None
        } else {
            Some(SampleLoan { claim: self })
        }
    }
}

impl<T> Drop for LoanClaim<'_, T> {
    fn drop(&mut self) {
        self.buffer.clear();
        self.flag.store(false, Ordering::Release);
    }
}

/// Samples loaned from a reader's buffer.
///
/// Dropping the loan returns it; payloads are released and the buffer can
/// be reused by the next take.
pub struct SampleLoan<'a, T> {
    claim: LoanClaim<'a, T>,
}

impl<'a, T> SampleLoan<'a, T> {
    /// Number of slots in the loan (valid and lifecycle).
    #[must_use]
    pub fn len(&self) -> usize {
        self.claim.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<LoanedSample<'_, T>> {
        let buffer = &*self.claim.buffer;
        let info = buffer.infos.infos.get(index)?;
        let data = buffer.samples.slots.get(index)?.as_ref();
        Some(LoanedSample { data, info })
    }

    /// Iterate over the loaned slots in delivery order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = LoanedSample<'_, T>> + '_ {
        let buffer = &*self.claim.buffer;
        buffer
            .samples
            .slots
            .iter()
            .zip(buffer.infos.infos.iter())
            .map(|(data, info)| LoanedSample {
                data: data.as_ref(),
                info,
            })
    }

    /// The metadata slots.
    #[must_use]
    pub fn infos(&self) -> &[SampleInfo] {
        &self.claim.buffer.infos.infos
    }

    /// Return the loan now instead of at end of scope.
    pub fn return_loan(self) {
        drop(self);
    }
}

impl<T> fmt::Debug for SampleLoan<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleLoan")
            .field("len", &self.len())
            .field("capacity", &self.claim.buffer.capacity())
            .finish()
    }
}

/// One (sample, info) slot of a [`SampleLoan`].
pub struct LoanedSample<'a, T> {
    data: Option<&'a T>,
    info: &'a SampleInfo,
}

impl<'a, T> LoanedSample<'a, T> {
    /// The payload; `None` for `valid_data == false` slots.
    #[must_use]
    pub fn data(&self) -> Option<&'a T> {
        self.data
    }

    #[must_use]
    pub fn info(&self) -> &'a SampleInfo {
        self.info
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.info.valid_data
    }
}

impl<T> Clone for LoanedSample<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LoanedSample<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dds::reader::cache::{InstanceState, SampleState, ViewState};
    use crate::dds::InstanceHandle;
    use std::time::SystemTime;

    fn info(valid: bool) -> SampleInfo {
        SampleInfo {
            sample_state: SampleState::NotRead,
            view_state: ViewState::New,
            instance_state: InstanceState::Alive,
            valid_data: valid,
            instance_handle: InstanceHandle::NIL,
            publication_handle: InstanceHandle::NIL,
            source_timestamp: SystemTime::now(),
            disposed_generation_count: 0,
            no_writers_generation_count: 0,
        }
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            SampleSeq::<u32>::with_capacity(0),
            Err(Error::BadParameter(_))
        ));
        assert!(SampleInfoSeq::with_capacity(0).is_err());
    }

    #[test]
    fn mismatched_capacities_are_rejected() {
        let samples = SampleSeq::<u32>::with_capacity(4).expect("seq");
        let infos = SampleInfoSeq::with_capacity(8).expect("infos");
        assert!(LoanBuffer::new(samples, infos).is_err());
    }

    #[test]
    fn second_claim_fails_until_loan_returned() {
        let slot = LoanSlot::<u32>::new(2);
        let mut claim = slot.acquire().expect("claim");
        claim.buffer().push(Some(1), info(true));
        let loan = claim.into_loan().expect("loan");
        assert!(slot.is_loaned());

        assert!(matches!(slot.acquire(), Err(Error::PreconditionNotMet(_))));

        loan.return_loan();
        assert!(!slot.is_loaned());
        let claim = slot.acquire().expect("reclaim");
        assert!(claim.into_loan().is_none());
        assert!(!slot.is_loaned());
    }

    #[test]
    fn buffer_never_exceeds_capacity() {
        let slot = LoanSlot::<u32>::new(2);
        let mut claim = slot.acquire().expect("claim");
        for v in 0..5 {
            claim.buffer().push(Some(v), info(true));
        }
        let loan = claim.into_loan().expect("loan");
        assert_eq!(loan.len(), 2);
    }

    #[test]
    fn invalid_slots_never_expose_payload() {
        let slot = LoanSlot::<u32>::new(4);
        let mut claim = slot.acquire().expect("claim");
        claim.buffer().push(Some(1), info(true));
        claim.buffer().push(Some(99), info(false));
        let loan = claim.into_loan().expect("loan");

        let slots: Vec<_> = loan.iter().collect();
        assert_eq!(slots[0].data(), Some(&1));
        assert!(slots[1].data().is_none());
        assert!(!slots[1].is_valid());
        assert!(loan.get(2).is_none());
    }

    #[test]
    fn install_only_once() {
        let slot = LoanSlot::<u32>::new(4);
        slot.install(LoanBuffer::with_capacity(3).expect("buffer"))
            .expect("install");
        assert!(slot
            .install(LoanBuffer::with_capacity(3).expect("buffer"))
            .is_err());
        let claim = slot.acquire().expect("claim");
        assert!(claim.into_loan().is_none());
    }
}
