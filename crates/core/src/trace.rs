//! `tracef` formatting.
//!
//! The formatter understands `%c %d %x %s %f` and `%%`. It pulls each value
//! from an [`ArgSource`], which is either a list of pre-decoded [`TraceArg`]s
//! handed over by a guest engine that knows the call signature, or
//! [`VarArgs`], a walker over a C-style argument block in guest memory where
//! every slot is bounds-checked before it is read.

use crate::error::Trap;
use crate::memory::Memory;

/// A decoded `tracef` argument.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceArg {
    Int(i32),
    Float(f64),
    Str(String),
}

/// Supplies values to the formatter in order.
pub trait ArgSource {
    fn next_int(&mut self) -> Result<i32, Trap>;
    fn next_float(&mut self) -> Result<f64, Trap>;
    fn next_str(&mut self) -> Result<String, Trap>;
}

/// Arguments already decoded by the caller.
pub struct TypedArgs<'a> {
    args: &'a [TraceArg],
    index: usize,
}

impl<'a> TypedArgs<'a> {
    pub fn new(args: &'a [TraceArg]) -> Self {
        TypedArgs { args, index: 0 }
    }

    fn next(&mut self) -> Result<&'a TraceArg, Trap> {
        let index = self.index;
        let arg = self.args.get(index).ok_or(Trap::MissingArgument { index })?;
        self.index += 1;
        Ok(arg)
    }
}

impl ArgSource for TypedArgs<'_> {
    fn next_int(&mut self) -> Result<i32, Trap> {
        let index = self.index;
        match self.next()? {
            TraceArg::Int(v) => Ok(*v),
            TraceArg::Float(v) => Ok(*v as i32),
            TraceArg::Str(_) => Err(Trap::MissingArgument { index }),
        }
    }

    fn next_float(&mut self) -> Result<f64, Trap> {
        let index = self.index;
        match self.next()? {
            TraceArg::Int(v) => Ok(*v as f64),
            TraceArg::Float(v) => Ok(*v),
            TraceArg::Str(_) => Err(Trap::MissingArgument { index }),
        }
    }

    fn next_str(&mut self) -> Result<String, Trap> {
        let index = self.index;
        match self.next()? {
            TraceArg::Str(s) => Ok(s.clone()),
            _ => Err(Trap::MissingArgument { index }),
        }
    }
}

/// Walks a packed argument block in guest memory: 4-byte slots for
/// integers, characters and string pointers, 8-byte slots for doubles.
pub struct VarArgs<'m> {
    memory: &'m Memory,
    ptr: u32,
}

impl<'m> VarArgs<'m> {
    pub fn new(memory: &'m Memory, ptr: u32) -> Self {
        VarArgs { memory, ptr }
    }

    fn advance(&mut self, size: u32) -> Result<u32, Trap> {
        let at = self.ptr;
        self.ptr = self.ptr.checked_add(size).ok_or(Trap::Overflow)?;
        Ok(at)
    }
}

impl ArgSource for VarArgs<'_> {
    fn next_int(&mut self) -> Result<i32, Trap> {
        let at = self.advance(4)?;
        Ok(self.memory.read_u32(at)? as i32)
    }

    fn next_float(&mut self) -> Result<f64, Trap> {
        let at = self.advance(8)?;
        self.memory.read_f64(at)
    }

    fn next_str(&mut self) -> Result<String, Trap> {
        let at = self.advance(4)?;
        let ptr = self.memory.read_u32(at)?;
        let bytes = self.memory.cstr(ptr)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Expand `fmt` (without its terminator) against `args`.
pub fn format<A: ArgSource>(fmt: &[u8], args: &mut A) -> Result<String, Trap> {
    let mut out: Vec<u8> = Vec::with_capacity(fmt.len());
    let mut bytes = fmt.iter().copied();

    while let Some(b) = bytes.next() {
        if b != b'%' {
            out.push(b);
            continue;
        }
        let Some(spec) = bytes.next() else {
            break;
        };
        match spec {
            b'%' => out.push(b'%'),
            b'c' => {
                let c = char::from_u32(args.next_int()? as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            b'd' => out.extend_from_slice(args.next_int()?.to_string().as_bytes()),
            b'x' => out.extend_from_slice(format!("{:x}", args.next_int()? as u32).as_bytes()),
            b's' => out.extend_from_slice(args.next_str()?.as_bytes()),
            b'f' => out.extend_from_slice(args.next_float()?.to_string().as_bytes()),
            other => {
                out.push(b'%');
                out.push(other);
            }
        }
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(fmt: &str, args: &[TraceArg]) -> Result<String, Trap> {
        format(fmt.as_bytes(), &mut TypedArgs::new(args))
    }

    #[test]
    fn test_specifiers() {
        let args = [
            TraceArg::Int('A' as i32),
            TraceArg::Int(-42),
            TraceArg::Int(255),
            TraceArg::Str("hi".into()),
            TraceArg::Float(1.5),
        ];
        assert_eq!(typed("%c %d %x %s %f 100%%", &args).unwrap(), "A -42 ff hi 1.5 100%");
    }

    #[test]
    fn test_hex_is_unsigned() {
        assert_eq!(typed("%x", &[TraceArg::Int(-1)]).unwrap(), "ffffffff");
    }

    #[test]
    fn test_unknown_and_trailing_percent() {
        assert_eq!(typed("a%qb", &[]).unwrap(), "a%qb");
        assert_eq!(typed("done%", &[]).unwrap(), "done");
    }

    #[test]
    fn test_missing_argument() {
        assert_eq!(typed("%d %d", &[TraceArg::Int(1)]), Err(Trap::MissingArgument { index: 1 }));
        assert_eq!(typed("%s", &[TraceArg::Int(1)]), Err(Trap::MissingArgument { index: 0 }));
    }

    #[test]
    fn test_varargs_walk() {
        let mut mem = Memory::new();
        let block = 0x1000usize;
        let name = 0x2000u32;
        mem.slice_mut(name, 4).unwrap().copy_from_slice(b"cat\0");
        let mut raw = Vec::new();
        raw.extend_from_slice(&7i32.to_le_bytes());
        raw.extend_from_slice(&name.to_le_bytes());
        raw.extend_from_slice(&0.25f64.to_le_bytes());
        mem.slice_mut(block as u32, raw.len() as u32).unwrap().copy_from_slice(&raw);

        let out = format(b"%d %s %f", &mut VarArgs::new(&mem, block as u32)).unwrap();
        assert_eq!(out, "7 cat 0.25");
    }

    #[test]
    fn test_varargs_bounds_checked() {
        let mut mem = Memory::new();
        assert!(matches!(format(b"%d", &mut VarArgs::new(&mem, 0xfffe)), Err(Trap::OutOfBounds { .. })));
        assert!(matches!(format(b"%f", &mut VarArgs::new(&mem, 0xfffa)), Err(Trap::OutOfBounds { .. })));
        // A string pointer aimed past the end of memory
        mem.slice_mut(0x100, 4).unwrap().copy_from_slice(&0x20000u32.to_le_bytes());
        assert!(matches!(format(b"%s", &mut VarArgs::new(&mem, 0x100)), Err(Trap::OutOfBounds { .. })));
        assert!(format(b"%d", &mut VarArgs::new(&mem, u32::MAX - 1)).is_err());
    }
}
