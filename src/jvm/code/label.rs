use std::fmt;

/// Opaque position marker inside one method body
///
/// Labels are placed with [`super::Instruction::Label`] and referenced by jumps, switches,
/// exception ranges, local variable ranges, and frames. Offsets are only computed when the body
/// is encoded, so inserting instructions never invalidates a label.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Label(u32);

impl Label {
    /// First label handed out by a fresh generator
    pub const FIRST: Label = Label(0);

    fn next(&self) -> Label {
        Label(self.0 + 1)
    }
}

/// Generates new labels
pub trait LabelGenerator {
    /// Generate a fresh label
    fn fresh_label(&mut self) -> Label;
}

/// Label generator handing out labels in increasing order
///
/// Cloning does not split the generator source - the cloned generator will produce the same
/// sequence of labels as the original.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SequentialLabels(Label);

impl SequentialLabels {
    pub fn new() -> SequentialLabels {
        SequentialLabels(Label::FIRST)
    }
}

impl Default for SequentialLabels {
    fn default() -> Self {
        SequentialLabels::new()
    }
}

impl LabelGenerator for SequentialLabels {
    fn fresh_label(&mut self) -> Label {
        let to_return = self.0;
        self.0 = self.0.next();
        to_return
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "L{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels_are_fresh() {
        let mut labels = SequentialLabels::new();
        let first = labels.fresh_label();
        let mut copy = labels.clone();
        let second = labels.fresh_label();
        assert_eq!(first, Label::FIRST);
        assert_ne!(first, second);
        assert_eq!(copy.fresh_label(), second);
        assert_eq!(format!("{:?}", second), "L1");
    }
}
