//! Wire -> value decoding.
use super::{CodecError, element_type};
use crate::registry::ResolvedService;
use crate::schema::Type;
use serde_json::{Map, Value};
use thrift::protocol::{TInputProtocol, TType};

/// Recursive decoder of wire data into generic values, driven by schema type
/// references.
///
/// Borrows the session's input protocol for the duration of one decode; the service
/// schema supplies the type registry and struct definitions.
pub struct ValueReader<'a> {
    protocol: &'a mut dyn TInputProtocol,
    service: &'a ResolvedService,
}

impl<'a> ValueReader<'a> {
    pub fn new(protocol: &'a mut dyn TInputProtocol, service: &'a ResolvedService) -> Self {
        ValueReader { protocol, service }
    }

    /// Reads one value of the given schema type from the input protocol.
    ///
    /// `void` and unresolved type names consume nothing and yield `Value::Null`; this
    /// is how void returns decode.
    pub fn read_value(&mut self, ty: &Type) -> Result<Value, CodecError> {
        match self.service.resolve_type(&ty.name) {
            TType::Bool => Ok(Value::Bool(self.protocol.read_bool()?)),
            TType::I08 => Ok(Value::from(self.protocol.read_i8()?)),
            TType::I16 => Ok(Value::from(self.protocol.read_i16()?)),
            TType::I32 => Ok(Value::from(self.protocol.read_i32()?)),
            TType::I64 => Ok(Value::from(self.protocol.read_i64()?)),
            TType::Double => {
                let raw = self.protocol.read_double()?;
                serde_json::Number::from_f64(raw)
                    .map(Value::Number)
                    .ok_or(CodecError::NonFiniteDouble(raw))
            }
            TType::String => Ok(Value::String(self.protocol.read_string()?)),
            TType::Struct => self.read_struct(ty),
            TType::Map => self.read_map(ty),
            TType::List => self.read_list(ty),
            TType::Set => self.read_set(ty),
            TType::Stop | TType::Void => Ok(Value::Null),
            other => Err(CodecError::UnsupportedType {
                name: ty.name.clone(),
                tag: other,
            }),
        }
    }

    fn read_struct(&mut self, ty: &Type) -> Result<Value, CodecError> {
        let service = self.service;
        let schema = service
            .struct_schema(&ty.name)
            .ok_or_else(|| CodecError::UnknownStruct(ty.name.clone()))?;

        self.protocol.read_struct_begin()?;
        let mut fields = Map::new();
        loop {
            let header = self.protocol.read_field_begin()?;
            if header.field_type == TType::Stop {
                break;
            }
            match header.id.and_then(|id| schema.field_by_id(id)) {
                Some(field) => {
                    let value = self.read_value(&field.ty)?;
                    fields.insert(field.name.clone(), value);
                }
                None => {
                    // Field the schema does not declare: drop the payload, keep going.
                    tracing::trace!(
                        strukt = schema.name(),
                        field_id = ?header.id,
                        "skipping undeclared field"
                    );
                    self.protocol.skip(header.field_type)?;
                }
            }
            self.protocol.read_field_end()?;
        }
        self.protocol.read_struct_end()?;
        Ok(Value::Object(fields))
    }

    fn read_map(&mut self, ty: &Type) -> Result<Value, CodecError> {
        let value_ty = element_type(ty)?;
        let header = self.protocol.read_map_begin()?;
        let mut entries = Map::new();
        for _ in 0..header.size {
            let key = self.protocol.read_string()?;
            let value = self.read_value(value_ty)?;
            entries.insert(key, value);
        }
        self.protocol.read_map_end()?;
        Ok(Value::Object(entries))
    }

    fn read_list(&mut self, ty: &Type) -> Result<Value, CodecError> {
        let element_ty = element_type(ty)?;
        let header = self.protocol.read_list_begin()?;
        let mut elements = Vec::with_capacity(header.size.max(0) as usize);
        for _ in 0..header.size {
            elements.push(self.read_value(element_ty)?);
        }
        self.protocol.read_list_end()?;
        Ok(Value::Array(elements))
    }

    fn read_set(&mut self, ty: &Type) -> Result<Value, CodecError> {
        let element_ty = element_type(ty)?;
        let header = self.protocol.read_set_begin()?;
        let mut elements = Vec::with_capacity(header.size.max(0) as usize);
        for _ in 0..header.size {
            elements.push(self.read_value(element_ty)?);
        }
        self.protocol.read_set_end()?;
        Ok(Value::Array(elements))
    }
}
