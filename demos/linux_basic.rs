use mpu6050_dmp_rs::{self, accel_raw_to_g, gyro_raw_to_dps, temp_raw_to_celsius, AccelFullScale, GyroFullScale, Sensors};
use std::thread;
use std::time::Duration;
use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

fn main() {
    println!("MPU6050 - Ejemplo básico");

    // Flag para controlar la ejecución del programa
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    // Configurar el manejador para Ctrl+C
    ctrlc::set_handler(move || {
        println!("\nDeteniendo el programa...");
        r.store(false, Ordering::SeqCst);
    }).expect("Error al configurar el manejador de Ctrl+C");

    // Crear dispositivo MPU6050 con la dirección I2C estándar
    let mut device = match mpu6050_dmp_rs::new_linux_device("/dev/i2c-1", 0x68) {
        Ok(device) => device,
        Err(e) => {
            eprintln!("Error al abrir dispositivo I2C: {:?}", e);
            return;
        }
    };

    // Inicializar el dispositivo
    if let Err(e) = device.initialize() {
        eprintln!("Error al inicializar el dispositivo: {:?}", e);
        return;
    }
    println!("Dispositivo inicializado correctamente");

    // Alimentar giroscopio y acelerómetro
    if let Err(e) = device.set_sensors(Sensors::GYRO | Sensors::ACCEL) {
        eprintln!("Error al alimentar los sensores: {:?}", e);
        return;
    }

    // Configurar escalas
    if let Err(e) = device.set_accel_fullscale(AccelFullScale::Fs4G) {
        eprintln!("Error al configurar la escala del acelerómetro: {:?}", e);
    }
    if let Err(e) = device.set_gyro_fullscale(GyroFullScale::Fs250Dps) {
        eprintln!("Error al configurar la escala del giroscopio: {:?}", e);
    }

    // Tasa de muestreo (ajusta también el filtro paso bajo)
    if let Err(e) = device.set_sample_rate(100) {
        eprintln!("Error al configurar la tasa de muestreo: {:?}", e);
    }
    println!("Tasa de muestreo: {:?} Hz, filtro: {:?}", device.get_sample_rate(), device.state().lpf);

    // Leer datos continuamente hasta que se presione Ctrl+C
    println!("Leyendo datos. Presiona Ctrl+C para detener...");

    while running.load(Ordering::SeqCst) {
        match device.read_motion6() {
            Ok(m) => {
                let accel = accel_raw_to_g(m.accel, AccelFullScale::Fs4G);
                let gyro = gyro_raw_to_dps(m.gyro, GyroFullScale::Fs250Dps);
                println!("Aceleración: x={:.2}G, y={:.2}G, z={:.2}G", accel[0], accel[1], accel[2]);
                println!("Giroscopio: x={:.2}°/s, y={:.2}°/s, z={:.2}°/s", gyro[0], gyro[1], gyro[2]);
            }
            Err(e) => eprintln!("Error al leer los sensores: {:?}", e),
        }

        // Leer y mostrar temperatura en Celsius
        match device.read_temperature_raw() {
            Ok(raw) => println!("Temperatura: {:.2}°C", temp_raw_to_celsius(raw)),
            Err(e) => eprintln!("Error al leer temperatura: {:?}", e),
        }
        println!("-------------------");
        thread::sleep(Duration::from_millis(200));
    }

    // Dejar los sensores en reposo
    let _ = device.set_sensors(Sensors::empty());
    println!("Ejemplo finalizado");
}
