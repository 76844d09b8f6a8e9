//! Funciones de conversión para datos del sensor MPU6050
//!
//! Este módulo convierte datos raw del sensor a unidades físicas
//! (aceleración en G, velocidad angular en grados por segundo y temperatura
//! en grados Celsius) y calcula la orientación a partir de los cuaterniones
//! del DMP.

use crate::types::AccelFullScale;
use crate::types::GyroFullScale;

/// Escala de los cuaterniones del paquete DMP (formato Q14)
pub const DMP_QUAT_SCALE: f32 = 16384.0;

/// Convierte datos brutos de acelerómetro a G según la escala configurada
///
/// # Arguments
/// * `raw` - Valores brutos del acelerómetro [x, y, z]
/// * `scale` - Configuración de escala completa del acelerómetro
///
/// # Returns
/// Aceleración en G [x, y, z]
pub fn accel_raw_to_g(raw: [i16; 3], scale: AccelFullScale) -> [f32; 3] {
    let factor = match scale {
        AccelFullScale::Fs2G => 2.0 / 32768.0,
        AccelFullScale::Fs4G => 4.0 / 32768.0,
        AccelFullScale::Fs8G => 8.0 / 32768.0,
        AccelFullScale::Fs16G => 16.0 / 32768.0,
    };

    raw.map(|v| v as f32 * factor)
}

/// Convierte datos brutos de giroscopio a grados/segundo según la escala configurada
pub fn gyro_raw_to_dps(raw: [i16; 3], scale: GyroFullScale) -> [f32; 3] {
    let factor = match scale {
        GyroFullScale::Fs250Dps => 250.0 / 32768.0,
        GyroFullScale::Fs500Dps => 500.0 / 32768.0,
        GyroFullScale::Fs1000Dps => 1000.0 / 32768.0,
        GyroFullScale::Fs2000Dps => 2000.0 / 32768.0,
    };

    raw.map(|v| v as f32 * factor)
}

/// Convierte datos brutos de temperatura a grados Celsius
pub fn temp_raw_to_celsius(raw: i16) -> f32 {
    // Datasheet del MPU6050: 340 LSB/°C con 36.53 °C de desplazamiento
    raw as f32 / 340.0 + 36.53
}

/// Cuaternión de orientación (w, x, y, z)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// Construye el cuaternión a partir de los valores Q14 del paquete DMP
    pub fn from_raw(raw: [i16; 4]) -> Self {
        let [w, x, y, z] = raw.map(|v| v as f32 / DMP_QUAT_SCALE);
        Self { w, x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Cuaternión unitario; un cuaternión nulo se devuelve sin cambios
    pub fn normalize(&self) -> Self {
        let m = self.magnitude();
        if m == 0.0 {
            return *self;
        }
        Self::new(self.w / m, self.x / m, self.y / m, self.z / m)
    }

    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Producto de Hamilton `self * q`
    pub fn product(&self, q: &Quaternion) -> Self {
        Self::new(
            self.w * q.w - self.x * q.x - self.y * q.y - self.z * q.z,
            self.w * q.x + self.x * q.w + self.y * q.z - self.z * q.y,
            self.w * q.y - self.x * q.z + self.y * q.w + self.z * q.x,
            self.w * q.z + self.x * q.y - self.y * q.x + self.z * q.w,
        )
    }
}

/// Vector de gravedad estimado a partir de la orientación
pub fn gravity_from_quaternion(q: &Quaternion) -> [f32; 3] {
    [
        2.0 * (q.x * q.z - q.w * q.y),
        2.0 * (q.w * q.x + q.y * q.z),
        q.w * q.w - q.x * q.x - q.y * q.y + q.z * q.z,
    ]
}

/// Ángulos de Euler [psi, theta, phi] en radianes
pub fn euler_from_quaternion(q: &Quaternion) -> [f32; 3] {
    [
        (2.0 * q.x * q.y - 2.0 * q.w * q.z).atan2(2.0 * q.w * q.w + 2.0 * q.x * q.x - 1.0),
        -(2.0 * q.x * q.z + 2.0 * q.w * q.y).clamp(-1.0, 1.0).asin(),
        (2.0 * q.y * q.z - 2.0 * q.w * q.x).atan2(2.0 * q.w * q.w + 2.0 * q.z * q.z - 1.0),
    ]
}

/// Guiñada, cabeceo y alabeo [yaw, pitch, roll] en radianes
pub fn yaw_pitch_roll(q: &Quaternion, gravity: &[f32; 3]) -> [f32; 3] {
    let [gx, gy, gz] = *gravity;
    [
        // yaw: alrededor de Z
        (2.0 * q.x * q.y - 2.0 * q.w * q.z).atan2(2.0 * q.w * q.w + 2.0 * q.x * q.x - 1.0),
        // pitch: alrededor de Y
        (gx / (gy * gy + gz * gz).sqrt()).atan(),
        // roll: alrededor de X
        (gy / (gx * gx + gz * gz).sqrt()).atan(),
    ]
}
