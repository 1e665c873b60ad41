use crate::jvm::code::{peak_stack_depth, FieldOp, Instruction, InvokeType, MemberRef};
use std::collections::HashSet;

/// Configuration of the entry-logging pass
#[derive(Clone, Debug)]
pub struct Settings {
    /// Classes to instrument, written as `my/package/Klass`
    pub targets: HashSet<String>,

    /// Start of the logged message, followed by `Klass.method` (eg. `Enter method-> `)
    pub message_prefix: String,

    /// Static field holding the stream written to (eg. `java/lang/System.out`)
    pub output_stream: MemberRef,

    /// Virtual method of the stream taking the message (eg. `java/io/PrintStream.println`)
    pub print_method: MemberRef,

    /// Smallest amount by which `max_stack` of an instrumented method grows
    ///
    /// The actual increment is the larger of this and the peak stack depth of the prologue.
    pub minimum_stack_reserve: u16,
}

impl Settings {
    pub fn new<I, S>(targets: I) -> Settings
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Settings {
            targets: targets
                .into_iter()
                .map(|target| target.as_ref().replace('.', "/"))
                .collect(),
            message_prefix: String::from("Enter method-> "),
            output_stream: MemberRef::new("java/lang/System", "out", "Ljava/io/PrintStream;"),
            print_method: MemberRef::new("java/io/PrintStream", "println", "(Ljava/lang/String;)V"),
            minimum_stack_reserve: 3,
        }
    }

    /// Is this class (given by its internal name) instrumented?
    pub fn is_target(&self, class_name: &str) -> bool {
        self.targets.contains(class_name)
    }

    /// Instructions logging entry into a method
    pub fn prologue(&self, class_name: &str, method_name: &str) -> Vec<Instruction> {
        let message = format!("{}{}.{}", self.message_prefix, class_name, method_name);
        vec![
            Instruction::Field(FieldOp::GetStatic, self.output_stream.clone()),
            Instruction::ldc_string(message),
            Instruction::Invoke {
                kind: InvokeType::Virtual,
                method: self.print_method.clone(),
                is_interface: false,
            },
        ]
    }

    /// How much `max_stack` must grow to make room for the prologue
    pub fn stack_increment(&self, prologue: &[Instruction]) -> u16 {
        let peak = peak_stack_depth(prologue).unwrap_or(self.minimum_stack_reserve);
        peak.max(self.minimum_stack_reserve)
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new(Vec::<String>::new())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::LoadableConstant;

    #[test]
    fn targets_use_internal_names() {
        let settings = Settings::new(["Sample", "me.alec.Other"]);
        assert!(settings.is_target("Sample"));
        assert!(settings.is_target("me/alec/Other"));
        assert!(!settings.is_target("me.alec.Other"));
        assert!(!settings.is_target("Samples"));
        assert!(!Settings::default().is_target("Sample"));
    }

    #[test]
    fn prologue_shape() {
        let settings = Settings::new(["Sample"]);
        let prologue = settings.prologue("Sample", "run");
        assert_eq!(
            prologue[1],
            Instruction::Ldc(LoadableConstant::String(String::from("Enter method-> Sample.run")))
        );
        assert_eq!(settings.stack_increment(&prologue), 3);
    }

    #[test]
    fn increment_follows_the_prologue() {
        let mut settings = Settings::new(["Sample"]);
        settings.minimum_stack_reserve = 0;
        let prologue = settings.prologue("Sample", "run");
        assert_eq!(settings.stack_increment(&prologue), 2);

        // A print method taking a `long` needs a deeper stack
        settings.print_method = MemberRef::new("Log", "enter", "(Ljava/lang/String;J)V");
        let mut prologue = settings.prologue("Sample", "run");
        prologue.insert(2, Instruction::Ldc(LoadableConstant::Long(0)));
        assert_eq!(settings.stack_increment(&prologue), 4);
    }
}
