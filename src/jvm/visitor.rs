use super::class_file::Version;
use super::code::{Code, Instruction};
use super::{ClassAccessFlags, ClassUnit, EditError, Error, FieldUnit, MethodUnit};

/// Class-level information delivered before any member
#[derive(Debug, Clone, Copy)]
pub struct ClassHeader<'a> {
    pub version: Version,
    pub access_flags: ClassAccessFlags,

    /// Internal name of the class
    pub name: &'a str,
    pub super_name: Option<&'a str>,
    pub interfaces: &'a [String],
}

/// Callbacks for walking a class with [`traverse`]
///
/// Every callback defaults to doing nothing, so handlers only implement the events they care
/// about. An error from any callback stops the traversal and is returned from [`traverse`].
///
/// Events arrive in a fixed order: the header, then every field in declaration order, then every
/// method in declaration order (start, each instruction, end), and finally the end of the class.
pub trait ClassVisitor {
    fn visit_header(&mut self, _header: &ClassHeader<'_>) -> Result<(), Error> {
        Ok(())
    }

    fn visit_field(&mut self, _field: &FieldUnit) -> Result<(), Error> {
        Ok(())
    }

    /// Start of a method, before any of its instructions
    ///
    /// Instructions inserted here are all visited afterwards.
    fn visit_method_start(&mut self, _method: &mut MethodEditor<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Instruction at [`MethodEditor::current`] (labels, line numbers, and frames included)
    fn visit_instruction(&mut self, _method: &mut MethodEditor<'_>) -> Result<(), Error> {
        Ok(())
    }

    fn visit_method_end(&mut self, _method: &MethodUnit) -> Result<(), Error> {
        Ok(())
    }

    fn visit_end(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Walk a class, delivering events to the visitor
pub fn traverse<V: ClassVisitor + ?Sized>(
    class: &mut ClassUnit,
    visitor: &mut V,
) -> Result<(), Error> {
    let header = ClassHeader {
        version: class.version,
        access_flags: class.access_flags,
        name: &class.name,
        super_name: class.super_name.as_deref(),
        interfaces: &class.interfaces,
    };
    visitor.visit_header(&header)?;

    for field in &class.fields {
        visitor.visit_field(field)?;
    }

    for method in &mut class.methods {
        let mut editor = MethodEditor::new(method);
        visitor.visit_method_start(&mut editor)?;
        while let Some(next) = editor.next_position() {
            editor.position = Some(next);
            visitor.visit_instruction(&mut editor)?;
        }
        visitor.visit_method_end(editor.method())?;
    }

    visitor.visit_end()
}

/// Mutable view of the method being visited
///
/// Edits are restricted to inserting instructions and growing the stack reservation, so the
/// traversal always knows which instructions are still ahead of it. Instructions inserted at or
/// before the current position are never visited. Instructions inserted after it are visited
/// once, in their final order.
#[derive(Debug)]
pub struct MethodEditor<'a> {
    method: &'a mut MethodUnit,

    /// Index of the instruction being visited (`None` before the first one)
    position: Option<usize>,
}

impl<'a> MethodEditor<'a> {
    fn new(method: &'a mut MethodUnit) -> MethodEditor<'a> {
        MethodEditor {
            method,
            position: None,
        }
    }

    fn next_position(&self) -> Option<usize> {
        let next = self.position.map_or(0, |position| position + 1);
        let len = self.method.code.as_ref().map_or(0, |code| code.instructions.len());
        if next < len {
            Some(next)
        } else {
            None
        }
    }

    pub fn method(&self) -> &MethodUnit {
        self.method
    }

    /// Index of the instruction being visited
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Instruction being visited
    pub fn current(&self) -> Option<&Instruction> {
        let position = self.position?;
        self.method.code.as_ref()?.instructions.get(position)
    }

    fn code_mut(&mut self) -> Result<&mut Code, EditError> {
        self.method.code.as_mut().ok_or(EditError::NoCode)
    }

    /// Insert instructions so that the first one ends up at `index`
    pub fn insert(&mut self, index: usize, instructions: Vec<Instruction>) -> Result<(), Error> {
        let inserted = instructions.len();
        let code = self.code_mut()?;
        let len = code.instructions.len();
        if index > len {
            return Err(EditError::IndexOutOfBounds { index, len }.into());
        }
        code.instructions.splice(index..index, instructions);

        if let Some(position) = self.position {
            if index <= position {
                self.position = Some(position + inserted);
            }
        }
        Ok(())
    }

    /// Insert instructions at the very start of the method body
    pub fn prepend(&mut self, instructions: Vec<Instruction>) -> Result<(), Error> {
        self.insert(0, instructions)
    }

    /// Increase the declared maximum operand stack depth
    pub fn reserve_stack(&mut self, extra: u16) -> Result<(), Error> {
        let code = self.code_mut()?;
        code.max_stack = code
            .max_stack
            .checked_add(extra)
            .ok_or(EditError::StackOverflow {
                max_stack: code.max_stack,
                extra,
            })?;
        Ok(())
    }
}
