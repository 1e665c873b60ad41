use super::Settings;
use crate::jvm::{
    encode, traverse, ClassHeader, ClassReader, ClassUnit, ClassVisitor, Error, MethodEditor,
};

/// Visitor inserting a logging prologue at the start of every method of target classes
///
/// Constructors and static initializers are left alone, as are methods without a body.
#[derive(Debug)]
pub struct EntryLogger<'s> {
    settings: &'s Settings,

    /// Name of the class being visited, if it is a target
    class_name: Option<String>,
    instrumented: usize,
}

impl<'s> EntryLogger<'s> {
    pub fn new(settings: &'s Settings) -> EntryLogger<'s> {
        EntryLogger {
            settings,
            class_name: None,
            instrumented: 0,
        }
    }

    /// Number of methods that got a prologue so far
    pub fn instrumented(&self) -> usize {
        self.instrumented
    }
}

impl<'s> ClassVisitor for EntryLogger<'s> {
    fn visit_header(&mut self, header: &ClassHeader<'_>) -> Result<(), Error> {
        self.class_name = if self.settings.is_target(header.name) {
            Some(header.name.to_owned())
        } else {
            None
        };
        Ok(())
    }

    fn visit_method_start(&mut self, editor: &mut MethodEditor<'_>) -> Result<(), Error> {
        let class_name = match &self.class_name {
            Some(class_name) => class_name,
            None => return Ok(()),
        };

        let method = editor.method();
        if method.is_initializer() {
            return Ok(());
        }
        if method.code.is_none() {
            log::debug!("Skipping '{}.{}' (no code)", class_name, method.name);
            return Ok(());
        }

        let prologue = self.settings.prologue(class_name, &method.name);
        let increment = self.settings.stack_increment(&prologue);
        log::debug!(
            "Instrumenting '{}.{}{}' (max stack +{})",
            class_name,
            method.name,
            method.descriptor,
            increment
        );
        editor.prepend(prologue)?;
        editor.reserve_stack(increment)?;
        self.instrumented += 1;
        Ok(())
    }
}

/// Add entry logging to a class, in place
///
/// Returns the number of methods instrumented (zero if the class isn't a target). Running this
/// twice on the same class inserts two prologues.
pub fn instrument(class: &mut ClassUnit, settings: &Settings) -> Result<usize, Error> {
    let mut logger = EntryLogger::new(settings);
    traverse(class, &mut logger)?;
    Ok(logger.instrumented())
}

/// Decode, instrument, and re-encode a class file
///
/// Classes that aren't targets are returned byte for byte, without decoding any method body.
pub fn transform_class(class_file: &[u8], settings: &Settings) -> Result<Vec<u8>, Error> {
    let reader = ClassReader::new(class_file)?;
    if !settings.is_target(reader.class_name()) {
        return Ok(class_file.to_vec());
    }

    let mut class = reader.read()?;
    let instrumented = instrument(&mut class, settings)?;
    let bytes = encode(&class)?;
    log::info!(
        "Instrumented {} method(s) of '{}' ({} -> {} bytes)",
        instrumented,
        class.name,
        class_file.len(),
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Version;
    use crate::jvm::code::{opcodes, Code, Instruction};
    use crate::jvm::{
        ClassAccessFlags, MethodAccessFlags, MethodUnit, CONSTRUCTOR_NAME, ROOT_CLASS_NAME,
        STATIC_INITIALIZER_NAME,
    };

    fn method(name: &str, max_stack: u16) -> MethodUnit {
        let mut method = MethodUnit::new(MethodAccessFlags::PUBLIC, name, "()V");
        let mut code = Code::new(max_stack, 1);
        code.instructions.push(Instruction::Plain(opcodes::RETURN));
        method.code = Some(code);
        method
    }

    fn sample() -> ClassUnit {
        let mut class = ClassUnit::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC,
            "Sample",
            Some(ROOT_CLASS_NAME),
        );
        class.methods.push(method(CONSTRUCTOR_NAME, 1));
        class.methods.push(method(STATIC_INITIALIZER_NAME, 0));
        class.methods.push(method("run", 1));
        class.methods.push(method("<init>x", 0));
        class
            .methods
            .push(MethodUnit::new(MethodAccessFlags::ABSTRACT, "later", "()V"));
        class
    }

    fn instructions(class: &ClassUnit, index: usize) -> &[Instruction] {
        &class.methods[index].code.as_ref().unwrap().instructions
    }

    #[test]
    fn initializers_are_skipped() {
        let settings = Settings::new(["Sample"]);
        let mut class = sample();
        assert_eq!(instrument(&mut class, &settings).unwrap(), 2);

        assert_eq!(instructions(&class, 0).len(), 1);
        assert_eq!(instructions(&class, 1).len(), 1);
        assert_eq!(
            instructions(&class, 2)[..3],
            settings.prologue("Sample", "run")[..]
        );
        assert_eq!(class.methods[2].code.as_ref().unwrap().max_stack, 4);

        // Only exact names mark initializers
        assert_eq!(instructions(&class, 3).len(), 4);
        assert!(class.methods[4].code.is_none());
    }

    #[test]
    fn other_classes_are_untouched() {
        let settings = Settings::new(["Other"]);
        let mut class = sample();
        assert_eq!(instrument(&mut class, &settings).unwrap(), 0);
        assert_eq!(class, sample());
    }

    #[test]
    fn instrumenting_twice_stacks_prologues() {
        let settings = Settings::new(["Sample"]);
        let mut class = sample();
        instrument(&mut class, &settings).unwrap();
        instrument(&mut class, &settings).unwrap();

        let prologue = settings.prologue("Sample", "run");
        let run = instructions(&class, 2);
        assert_eq!(run.len(), 7);
        assert_eq!(run[..3], prologue[..]);
        assert_eq!(run[3..6], prologue[..]);
        assert_eq!(class.methods[2].code.as_ref().unwrap().max_stack, 7);
    }

    #[test]
    fn pass_through_keeps_bytes() {
        let class = sample();
        let bytes = encode(&class).unwrap();
        let settings = Settings::new(["Other"]);
        assert_eq!(transform_class(&bytes, &settings).unwrap(), bytes);
    }
}
