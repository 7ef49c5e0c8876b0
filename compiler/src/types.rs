// types.rs — Value-type registry
//
// The fixed set of scalar/vector kinds a node can produce. Each kind knows
// how to decode a texture sample into a typed value, how (if at all) to
// encode a typed value into the float output channel, and how the runtime
// binds a uniform of that kind.
//
// Preconditions: none.
// Postconditions: all lookups are pure.
// Failure modes: `combine` → TypeMismatch; `decode`/`encode` on kinds
//   without a rule → UnsupportedConversion.
// Side effects: none.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diag::{GenError, GenResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean bit.
    Bit,
    /// Integer stored in one 0..=255 channel.
    Byte,
    /// Wrapping signed 32-bit integer.
    Int32,
    /// Wrapping unsigned 32-bit integer.
    UInt32,
    /// IEEE single-precision float.
    Float32,
    /// Two floats; spreads into two positional uniform arguments.
    Vec2,
}

pub const ALL_TYPES: [ValueType; 6] = [
    ValueType::Bit,
    ValueType::Byte,
    ValueType::Int32,
    ValueType::UInt32,
    ValueType::Float32,
    ValueType::Vec2,
];

impl ValueType {
    /// GLSL spelling used for declarations.
    pub fn gl_name(self) -> &'static str {
        match self {
            ValueType::Bit => "bool",
            ValueType::Byte | ValueType::Int32 => "int",
            ValueType::UInt32 => "uint",
            ValueType::Float32 => "float",
            ValueType::Vec2 => "vec2",
        }
    }

    /// Key the runtime uses to pick its uniform setter.
    pub fn binding_key(self) -> &'static str {
        match self {
            ValueType::Bit | ValueType::Byte | ValueType::Int32 => "1i",
            ValueType::UInt32 => "1ui",
            ValueType::Float32 => "1f",
            ValueType::Vec2 => "2f",
        }
    }

    /// Whether the runtime passes the value as several positional arguments.
    pub fn spreads_args(self) -> bool {
        matches!(self, ValueType::Vec2)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, ValueType::Byte | ValueType::Int32 | ValueType::UInt32)
    }

    /// Common type of two operands. Only identical kinds combine.
    pub fn combine(self, other: ValueType) -> GenResult<ValueType> {
        if self == other {
            Ok(self)
        } else {
            Err(GenError::type_mismatch("operand combination", self, other))
        }
    }

    /// Turn a `texture(...)` sample expression into a typed value expression.
    pub fn decode(self, sample: &str) -> GenResult<String> {
        match self {
            ValueType::Bit => Ok(format!("({}).x > 0.5", sample)),
            ValueType::Byte | ValueType::Int32 => Ok(format!("int(({}).x*255.0 + 0.5)", sample)),
            ValueType::UInt32 => Ok(format!("uint(({}).x*255.0 + 0.5)", sample)),
            ValueType::Float32 => Ok(format!("({}).x", sample)),
            ValueType::Vec2 => Err(GenError::UnsupportedConversion {
                ty: self.to_string(),
                direction: "texture input",
            }),
        }
    }

    /// Turn a typed value expression into the float written to the output.
    pub fn encode(self, expr: &str) -> GenResult<String> {
        match self {
            ValueType::Bit => Ok(format!("float({})", expr)),
            ValueType::Byte | ValueType::Int32 | ValueType::UInt32 => {
                Ok(format!("float({}) / 255.0", expr))
            }
            ValueType::Float32 => Ok(expr.to_string()),
            ValueType::Vec2 => Err(GenError::UnsupportedConversion {
                ty: self.to_string(),
                direction: "output",
            }),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bit => "Bit",
            ValueType::Byte => "Byte",
            ValueType::Int32 => "Int32",
            ValueType::UInt32 => "UInt32",
            ValueType::Float32 => "Float32",
            ValueType::Vec2 => "Vec2",
        };
        f.write_str(name)
    }
}
