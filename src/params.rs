//! Get and set solver options on a live context, keyed by the solver's
//! integer parameter ids.

use crate::context::Context;
use crate::error::BindingError;

impl Context {
    pub fn set_float_param(&mut self, key: i32, value: f64) -> Result<(), BindingError> {
        let status = unsafe { (self.table().set_double_param)(self.as_ptr(), key, value) };
        if status != 0 {
            log::warn!("set_double_param({key}, {value}) returned status {status}");
            return Err(BindingError::SetFloatParam { key, value });
        }
        Ok(())
    }

    pub fn set_int_param(&mut self, key: i32, value: i32) -> Result<(), BindingError> {
        let status = unsafe { (self.table().set_int_param)(self.as_ptr(), key, value) };
        if status != 0 {
            log::warn!("set_int_param({key}, {value}) returned status {status}");
            return Err(BindingError::SetIntParam { key, value });
        }
        Ok(())
    }

    pub fn get_float_param(&self, key: i32) -> Result<f64, BindingError> {
        let mut value = 0.0;
        let status = unsafe { (self.table().get_double_param)(self.as_ptr(), key, &mut value) };
        if status != 0 {
            log::warn!("get_double_param({key}) returned status {status}");
            return Err(BindingError::GetFloatParam { key });
        }
        Ok(value)
    }

    pub fn get_int_param(&self, key: i32) -> Result<i32, BindingError> {
        let mut value = 0;
        let status = unsafe { (self.table().get_int_param)(self.as_ptr(), key, &mut value) };
        if status != 0 {
            log::warn!("get_int_param({key}) returned status {status}");
            return Err(BindingError::GetIntParam { key });
        }
        Ok(value)
    }
}
