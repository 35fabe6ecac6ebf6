use cairn_alloc::{Vec, VecError};

fn main() -> Result<(), VecError> {
    let mut a = Vec::from_slice(&[1, 4, 3])?;
    a.push(5)?;

    for value in &a {
        println!("{value}");
    }
    Ok(())
}
