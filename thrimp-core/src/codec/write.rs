//! Value -> wire encoding.
use super::{CodecError, coerce, element_type};
use crate::registry::ResolvedService;
use crate::schema::{Field, Type};
use serde_json::Value;
use thrift::protocol::{
    TFieldIdentifier, TListIdentifier, TMapIdentifier, TOutputProtocol, TSetIdentifier,
    TStructIdentifier, TType,
};

/// Recursive encoder of generic values against schema type references.
///
/// Borrows the session's output protocol for the duration of one encode. A coercion
/// or shape failure aborts the enclosing frame immediately and surfaces as a
/// [`CodecError`]; nothing attempts to patch up a partially written frame.
pub struct ValueWriter<'a> {
    protocol: &'a mut dyn TOutputProtocol,
    service: &'a ResolvedService,
}

impl<'a> ValueWriter<'a> {
    pub fn new(protocol: &'a mut dyn TOutputProtocol, service: &'a ResolvedService) -> Self {
        ValueWriter { protocol, service }
    }

    /// Writes one field frame: header, recursively encoded value, end marker.
    pub fn write_field(&mut self, field: &Field, value: &Value) -> Result<(), CodecError> {
        let tag = self.service.resolve_type(&field.ty.name);
        self.protocol
            .write_field_begin(&TFieldIdentifier::new(field.name.clone(), tag, field.id))?;
        self.write_value(&field.ty, value)?;
        self.protocol.write_field_end()?;
        Ok(())
    }

    /// Writes one value of the given schema type to the output protocol.
    pub fn write_value(&mut self, ty: &Type, value: &Value) -> Result<(), CodecError> {
        match self.service.resolve_type(&ty.name) {
            TType::Bool => match value {
                Value::Bool(flag) => Ok(self.protocol.write_bool(*flag)?),
                _ => Err(mismatch(ty, value)),
            },
            TType::I08 => {
                let n = coerce::to_i8(value).ok_or_else(|| mismatch(ty, value))?;
                Ok(self.protocol.write_i8(n)?)
            }
            TType::I16 => {
                let n = coerce::to_i16(value).ok_or_else(|| mismatch(ty, value))?;
                Ok(self.protocol.write_i16(n)?)
            }
            TType::I32 => {
                let n = coerce::to_i32(value).ok_or_else(|| mismatch(ty, value))?;
                Ok(self.protocol.write_i32(n)?)
            }
            TType::I64 => {
                let n = coerce::to_i64(value).ok_or_else(|| mismatch(ty, value))?;
                Ok(self.protocol.write_i64(n)?)
            }
            TType::Double => {
                let n = coerce::to_f64(value).ok_or_else(|| mismatch(ty, value))?;
                Ok(self.protocol.write_double(n)?)
            }
            TType::String => match value {
                Value::String(text) => Ok(self.protocol.write_string(text)?),
                _ => Err(mismatch(ty, value)),
            },
            TType::Struct => self.write_struct(ty, value),
            TType::Map => self.write_map(ty, value),
            TType::List => self.write_list(ty, value),
            TType::Set => self.write_set(ty, value),
            other => Err(CodecError::UnsupportedType {
                name: ty.name.clone(),
                tag: other,
            }),
        }
    }

    fn write_struct(&mut self, ty: &Type, value: &Value) -> Result<(), CodecError> {
        let service = self.service;
        let schema = service
            .struct_schema(&ty.name)
            .ok_or_else(|| CodecError::UnknownStruct(ty.name.clone()))?;
        let object = value.as_object().ok_or_else(|| mismatch(ty, value))?;

        self.protocol
            .write_struct_begin(&TStructIdentifier::new(schema.name()))?;
        for field in schema.fields() {
            match object.get(&field.name) {
                // A null entry counts as absent; keys without a declared field are
                // simply not part of the wire contract and never looked at.
                Some(field_value) if !field_value.is_null() => {
                    self.write_field(field, field_value)?;
                }
                _ if field.optional => {}
                _ => {
                    return Err(CodecError::RequiredFieldMissing {
                        name: schema.name().to_string(),
                        field: field.name.clone(),
                    });
                }
            }
        }
        self.protocol.write_field_stop()?;
        self.protocol.write_struct_end()?;
        Ok(())
    }

    fn write_map(&mut self, ty: &Type, value: &Value) -> Result<(), CodecError> {
        let value_ty = element_type(ty)?;
        let object = value.as_object().ok_or_else(|| mismatch(ty, value))?;

        let value_tag = self.service.resolve_type(&value_ty.name);
        self.protocol.write_map_begin(&TMapIdentifier::new(
            TType::String,
            value_tag,
            object.len() as i32,
        ))?;
        for (key, entry) in object {
            self.protocol.write_string(key)?;
            self.write_value(value_ty, entry)?;
        }
        self.protocol.write_map_end()?;
        Ok(())
    }

    fn write_list(&mut self, ty: &Type, value: &Value) -> Result<(), CodecError> {
        let element_ty = element_type(ty)?;
        let elements = value.as_array().ok_or_else(|| mismatch(ty, value))?;

        let tag = self.service.resolve_type(&element_ty.name);
        self.protocol
            .write_list_begin(&TListIdentifier::new(tag, elements.len() as i32))?;
        for element in elements {
            self.write_value(element_ty, element)?;
        }
        self.protocol.write_list_end()?;
        Ok(())
    }

    fn write_set(&mut self, ty: &Type, value: &Value) -> Result<(), CodecError> {
        let element_ty = element_type(ty)?;
        let elements = value.as_array().ok_or_else(|| mismatch(ty, value))?;

        let tag = self.service.resolve_type(&element_ty.name);
        self.protocol
            .write_set_begin(&TSetIdentifier::new(tag, elements.len() as i32))?;
        for element in elements {
            self.write_value(element_ty, element)?;
        }
        self.protocol.write_set_end()?;
        Ok(())
    }
}

fn mismatch(ty: &Type, value: &Value) -> CodecError {
    CodecError::TypeMismatch {
        value: value.clone(),
        target: ty.to_string(),
    }
}
