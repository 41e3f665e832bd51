//! Lazy post-processing of intermediate records.
//!
//! The provider yields intermediate records through a [`RecordSource`]; the
//! [`PostProcessCursor`] applies the reconstruction function to one record
//! per [`advance`](PostProcessCursor::advance), so post-processing happens
//! exactly as the caller iterates.

use crate::error::DeferError;
use crate::schema::Record;
use crate::transform::PostProcessFn;
use crate::value::Value;

/// A lazy sequence of intermediate records produced by a provider.
///
/// Each `advance` is where control may block on the provider's I/O.
pub trait RecordSource {
    /// Pulls the next record; `Ok(None)` once the sequence is exhausted.
    fn advance(&mut self) -> Result<Option<Record>, DeferError>;

    /// Returns to the start of the sequence; fails if the source is not
    /// restartable.
    fn reset(&mut self) -> Result<(), DeferError>;

    /// Releases any resources the source holds. Must be idempotent.
    fn release(&mut self) {}
}

/// A restartable source replaying a fixed set of records.
///
/// Used by tests and by providers that materialize eagerly.
pub struct VecRecordSource {
    records: Vec<Record>,
    position: usize,
}

impl VecRecordSource {
    pub fn new(records: Vec<Record>) -> VecRecordSource {
        VecRecordSource {
            records,
            position: 0,
        }
    }
}

impl RecordSource for VecRecordSource {
    fn advance(&mut self) -> Result<Option<Record>, DeferError> {
        match self.records.get(self.position) {
            Some(record) => {
                self.position += 1;
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    fn reset(&mut self) -> Result<(), DeferError> {
        self.position = 0;
        Ok(())
    }
}

/// Enumeration state of a [`PostProcessCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No successful advance yet
    NotStarted,
    /// A current value is available
    Active,
    /// The inner sequence is exhausted
    Ended,
}

/// Applies the reconstruction function to each intermediate record as the
/// caller advances.
///
/// Single pass per reset: `NotStarted → Active → Ended`, back to
/// `NotStarted` on [`reset`](PostProcessCursor::reset).
pub struct PostProcessCursor {
    inner: Box<dyn RecordSource>,
    post_process: PostProcessFn,
    current: Option<Value>,
    state: CursorState,
}

impl PostProcessCursor {
    pub fn new(inner: Box<dyn RecordSource>, post_process: PostProcessFn) -> PostProcessCursor {
        PostProcessCursor {
            inner,
            post_process,
            current: None,
            state: CursorState::NotStarted,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Pulls one record and applies the reconstruction to it.
    ///
    /// Returns `Ok(true)` when a new current value is available, `Ok(false)`
    /// once the inner sequence is exhausted. A reconstruction failure is
    /// re-signalled as [`DeferError::PostProcess`] wrapping the original
    /// cause; it does not disturb previously yielded values, and a later
    /// `advance` continues with the next record. Failures pulling from the
    /// inner sequence belong to the delegated phase and propagate unwrapped.
    pub fn advance(&mut self) -> Result<bool, DeferError> {
        match self.inner.advance()? {
            Some(record) => {
                let result = (self.post_process)(&record).map_err(DeferError::post_process)?;
                self.current = Some(result);
                self.state = CursorState::Active;
                Ok(true)
            }
            None => {
                self.state = CursorState::Ended;
                Ok(false)
            }
        }
    }

    /// The value produced by the last successful advance.
    ///
    /// Only valid while `Active`; reading after the cursor has ended, or
    /// before the first advance, fails with [`DeferError::InvalidState`].
    pub fn current(&self) -> Result<&Value, DeferError> {
        match self.state {
            CursorState::Active => Ok(self
                .current
                .as_ref()
                .expect("active cursor holds a current value")),
            CursorState::NotStarted => Err(DeferError::InvalidState(
                "the cursor has not been advanced".to_string(),
            )),
            CursorState::Ended => Err(DeferError::InvalidState(
                "the cursor has ended".to_string(),
            )),
        }
    }

    /// Restarts enumeration from the beginning.
    ///
    /// Propagates the inner source's failure if it is not restartable.
    pub fn reset(&mut self) -> Result<(), DeferError> {
        self.inner.reset()?;
        self.current = None;
        self.state = CursorState::NotStarted;
        Ok(())
    }

    /// Releases the inner source's resources. Idempotent.
    pub fn release(&mut self) {
        self.inner.release();
    }
}
