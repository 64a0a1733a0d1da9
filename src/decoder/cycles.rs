use crate::{tags::IfdPointer, TiffFormatError, TiffResult};
use std::collections::HashSet;

/// The directories of a file form a singly linked list. Following a `next` pointer to an offset
/// that was already visited would never terminate, so every offset is recorded before its
/// directory is read and a repeated offset is reported as a cycle.
///
/// An offset that merely lies outside of the file is caught by the reader instead.
#[derive(Default, Debug)]
pub struct IfdCycles {
    visited: HashSet<IfdPointer>,
}

impl IfdCycles {
    pub fn new() -> Self {
        IfdCycles::default()
    }

    /// Record a visit to `ifd`, failing if it was visited before.
    pub fn visit(&mut self, ifd: IfdPointer) -> TiffResult<()> {
        if self.visited.insert(ifd) {
            Ok(())
        } else {
            Err(TiffFormatError::CycleInOffsets(ifd.0).into())
        }
    }
}

#[test]
fn cycles_are_detected() {
    let mut cycles = IfdCycles::new();

    cycles
        .visit(IfdPointer(0x20))
        .expect("first visit is valid");
    cycles
        .visit(IfdPointer(0x800))
        .expect("non-existing link is valid");

    cycles
        .visit(IfdPointer(0x20))
        .expect_err("cycle must be detected");
}

#[test]
fn revisit_reports_offset() {
    use crate::TiffError;

    let mut cycles = IfdCycles::new();
    cycles.visit(IfdPointer(8)).unwrap();

    match cycles.visit(IfdPointer(8)) {
        Err(TiffError::FormatError(TiffFormatError::CycleInOffsets(8))) => {}
        other => panic!("unexpected result {other:?}"),
    }
    cycles.visit(IfdPointer(16)).unwrap();
}
