use std::fmt;
use std::iter::Enumerate;
use std::slice::Iter;

/// Elements which occupy a variable number of slots in an `OffsetVec`
pub trait Width {
    fn width(&self) -> usize;
}

/// Offset into an `OffsetVec`
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Offset(pub usize);

/// A vector whose elements are addressed by the sum of the widths of the elements preceding them
/// instead of by their position.
///
/// The constant pool is the motivating case: indexing starts at 1 and `long`/`double` entries
/// occupy two slots, the second of which can never be referenced.
#[derive(Clone)]
pub struct OffsetVec<T> {
    /// Entries, along with their offset
    entries: Vec<(Offset, T)>,

    /// Offset of the next element to be added
    offset_len: Offset,
}

/// Outcome of looking up an element by its offset
#[derive(Debug, PartialEq)]
pub enum OffsetResult<'a, T> {
    /// Element was found at this position
    Ok(usize, &'a T),

    /// Offset falls inside the element at this position (or before the first element)
    InvalidOffset(usize),

    /// Offset is past the last element
    TooLarge,
}

impl<'a, T> OffsetResult<'a, T> {
    /// Keep only the element, if one was found
    pub fn ok(&self) -> Option<&'a T> {
        match self {
            OffsetResult::Ok(_, found) => Some(found),
            OffsetResult::InvalidOffset(_) | OffsetResult::TooLarge => None,
        }
    }
}

impl<T: Width> OffsetVec<T> {
    /// New empty vector whose first element will be at `initial_offset`
    pub fn new_starting_at(initial_offset: Offset) -> OffsetVec<T> {
        OffsetVec {
            entries: vec![],
            offset_len: initial_offset,
        }
    }

    /// Number of entries (not the sum of their widths)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset the next pushed element will get
    pub fn offset_len(&self) -> Offset {
        self.offset_len
    }

    /// Add an entry to the back and return its offset
    pub fn push(&mut self, slot: T) -> Offset {
        let offset = self.offset_len;
        self.offset_len.0 += slot.width();
        self.entries.push((offset, slot));
        offset
    }

    /// Find an entry by its offset
    ///
    /// Note: this uses binary search to find the offset
    pub fn get_offset(&self, offset: Offset) -> OffsetResult<'_, T> {
        match self.entries.binary_search_by_key(&offset, |(off, _)| *off) {
            Ok(found_idx) => OffsetResult::Ok(found_idx, &self.entries[found_idx].1),
            Err(insert_at) if insert_at == self.entries.len() && offset >= self.offset_len => {
                OffsetResult::TooLarge
            }
            Err(insert_at) => OffsetResult::InvalidOffset(insert_at),
        }
    }

    pub fn iter(&self) -> OffsetVecIter<'_, T> {
        OffsetVecIter(self.entries.iter().enumerate())
    }
}

impl<A: PartialEq> PartialEq for OffsetVec<A> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

/// Iterator over `(offset, position, element)` triples
pub struct OffsetVecIter<'a, T>(Enumerate<Iter<'a, (Offset, T)>>);

impl<'a, T> Iterator for OffsetVecIter<'a, T> {
    type Item = (Offset, usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(idx, (off, elem))| (*off, idx, elem))
    }
}

impl<'a, T: Width> IntoIterator for &'a OffsetVec<T> {
    type Item = (Offset, usize, &'a T);
    type IntoIter = OffsetVecIter<'a, T>;

    fn into_iter(self) -> OffsetVecIter<'a, T> {
        self.iter()
    }
}

impl<T: Width> Extend<T> for OffsetVec<T> {
    fn extend<U: IntoIterator<Item = T>>(&mut self, iter: U) {
        for elem in iter {
            self.push(elem);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for OffsetVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (off, elem) in &self.entries {
            list.entry(&format_args!("#{} = {:?}", off.0, elem));
        }
        list.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    enum Slot {
        Narrow(u8),
        Wide(u8),
    }

    impl Width for Slot {
        fn width(&self) -> usize {
            match self {
                Slot::Narrow(_) => 1,
                Slot::Wide(_) => 2,
            }
        }
    }

    fn pool() -> OffsetVec<Slot> {
        let mut slots = OffsetVec::new_starting_at(Offset(1));
        slots.extend(vec![Slot::Narrow(1), Slot::Wide(2), Slot::Narrow(3)]);
        slots
    }

    #[test]
    fn offsets_skip_wide_slots() {
        let slots = pool();
        assert_eq!(
            slots.iter().collect::<Vec<_>>(),
            vec![
                (Offset(1), 0, &Slot::Narrow(1)),
                (Offset(2), 1, &Slot::Wide(2)),
                (Offset(4), 2, &Slot::Narrow(3)),
            ]
        );
        assert_eq!(slots.offset_len(), Offset(5));
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn lookup_by_offset() {
        let slots = pool();
        assert_eq!(slots.get_offset(Offset(2)), OffsetResult::Ok(1, &Slot::Wide(2)));
        assert_eq!(slots.get_offset(Offset(4)).ok(), Some(&Slot::Narrow(3)));

        // second half of a wide slot, the reserved zero slot, and past the end
        assert_eq!(slots.get_offset(Offset(3)), OffsetResult::InvalidOffset(2));
        assert_eq!(slots.get_offset(Offset(0)), OffsetResult::InvalidOffset(0));
        assert_eq!(slots.get_offset(Offset(5)), OffsetResult::TooLarge);
    }
}
