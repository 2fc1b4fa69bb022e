use interface::{Data, Value, UID};

#[derive(UID)]
#[uid(field = "SlowOrbX-Mon")]
enum SlowOrbX {}

#[derive(UID)]
#[uid(data = i64, field = "Err-Mon")]
enum ErrorCode {}

fn main() {
    let orbit = Data::<SlowOrbX>::new(vec![0.1, -0.2]);
    let code = Data::<ErrorCode>::new(4);
    println!("{} = {}", orbit.field(), Value::from(orbit.clone()));
    println!("{} = {}", code.field(), Value::from(code));
}
