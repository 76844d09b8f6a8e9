use mpu6050_dmp_rs::conversion::{gravity_from_quaternion, yaw_pitch_roll};
use mpu6050_dmp_rs::{self, Mpu6050Error, Sensors};
use std::thread;
use std::time::Duration;
use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

fn main() {
    println!("MPU6050 - Ejemplo con DMP");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        println!("\nDeteniendo el programa...");
        r.store(false, Ordering::SeqCst);
    }).expect("Error al configurar el manejador de Ctrl+C");

    let mut device = match mpu6050_dmp_rs::new_linux_device("/dev/i2c-1", 0x68) {
        Ok(device) => device,
        Err(e) => {
            eprintln!("Error al abrir dispositivo I2C: {:?}", e);
            return;
        }
    };

    if let Err(e) = device.initialize() {
        eprintln!("Error al inicializar el dispositivo: {:?}", e);
        return;
    }

    // Carga del firmware (tarda unos segundos por la verificación)
    println!("Cargando firmware DMP...");
    if let Err(e) = device.load_default_firmware() {
        eprintln!("Error al cargar el DMP: {:?}", e);
        return;
    }

    if let Err(e) = device.set_sensors(Sensors::GYRO | Sensors::ACCEL) {
        eprintln!("Error al alimentar los sensores: {:?}", e);
        return;
    }
    if let Err(e) = device.set_dmp_enabled(true) {
        eprintln!("Error al activar el DMP: {:?}", e);
        return;
    }
    if let Err(e) = device.set_dmp_output_rate(50) {
        eprintln!("Error al configurar la tasa del DMP: {:?}", e);
    }
    println!("DMP activo a {} Hz", device.get_dmp_output_rate());

    while running.load(Ordering::SeqCst) {
        match device.read_dmp_packet() {
            Ok((packet, backlog)) => {
                let q = packet.quaternion;
                let gravity = gravity_from_quaternion(&q);
                let ypr = yaw_pitch_roll(&q, &gravity);
                println!(
                    "ypr: {:7.2} {:7.2} {:7.2}  (pendientes: {})",
                    ypr[0].to_degrees(),
                    ypr[1].to_degrees(),
                    ypr[2].to_degrees(),
                    backlog
                );
                if backlog > 0 {
                    continue;
                }
            }
            Err(Mpu6050Error::FifoInsufficientData) => {}
            Err(Mpu6050Error::FifoOverflow) => eprintln!("Desbordamiento del FIFO"),
            Err(e) => eprintln!("Error al leer el paquete DMP: {:?}", e),
        }
        thread::sleep(Duration::from_millis(5));
    }

    let _ = device.set_dmp_enabled(false);
    println!("Ejemplo finalizado");
}
