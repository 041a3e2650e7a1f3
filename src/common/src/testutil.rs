use crate::{Attribute, Constant, DataType, TableSchema, Tuple};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::env;
use std::path::PathBuf;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Converts an int vector to a Tuple.
///
/// # Argument
///
/// * `data` - Data to put into tuple.
pub fn int_vec_to_tuple(data: Vec<i32>) -> Tuple {
    Tuple::new(data.into_iter().map(Constant::Int).collect())
}

/// Creates a Vec of tuples containing IntFields given a 2D Vec of i32 's
pub fn create_tuple_list(tuple_data: Vec<Vec<i32>>) -> Vec<Tuple> {
    tuple_data.into_iter().map(int_vec_to_tuple).collect()
}

/// Creates a new table schema of integer fields with the given names.
pub fn get_int_table_schema(names: Vec<&str>) -> TableSchema {
    let mut attrs = Vec::new();
    for name in names {
        attrs.push(Attribute::new(name.to_string(), DataType::Int))
    }
    TableSchema::new(attrs)
}

/// Schema with one integer key and one string column.
pub fn get_int_string_schema(key: &str, text: &str, len: usize) -> TableSchema {
    TableSchema::from_vecs(vec![key, text], vec![DataType::Int, DataType::String(len)])
}

/// Builds `(int, string)` tuples.
pub fn int_string_tuples(rows: &[(i32, &str)]) -> Vec<Tuple> {
    rows.iter()
        .map(|(i, s)| Tuple::new(vec![Constant::Int(*i), Constant::from(*s)]))
        .collect()
}

/// `n` rows of `width` random ints drawn from `0..max`.
pub fn gen_random_int_rows(n: usize, width: usize, max: i32) -> Vec<Vec<i32>> {
    let mut rng = thread_rng();
    (0..n)
        .map(|_| (0..width).map(|_| rng.gen_range(0..max)).collect())
        .collect()
}

pub fn gen_rand_string(n: usize) -> String {
    thread_rng().sample_iter(Alphanumeric).take(n).map(char::from).collect()
}

pub fn gen_random_dir() -> PathBuf {
    init();
    let mut dir = env::temp_dir();
    dir.push(String::from("crusty"));
    let rand_string = gen_rand_string(10);
    dir.push(rand_string);
    dir
}

/// Compares two tuple lists ignoring order but respecting multiplicity.
pub fn compare_unordered_tuples(a: &[Tuple], mut b: Vec<Tuple>) -> bool {
    if a.len() != b.len() {
        return false;
    }
    for x in a {
        match b.iter().position(|y| y == x) {
            None => return false,
            Some(idx) => {
                b.swap_remove(idx);
            }
        }
    }
    b.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    #[test]
    fn test_compare() {
        let mut rng = thread_rng();
        let a = create_tuple_list(gen_random_int_rows(100, 3, 1000));
        let b = a.clone();
        assert!(compare_unordered_tuples(&a, b));
        let mut b = a.clone();
        b.shuffle(&mut rng);
        assert!(compare_unordered_tuples(&a, b));
        let mut b = a.clone();
        b.pop();
        assert!(!compare_unordered_tuples(&a, b));
        let mut b = a.clone();
        b[rng.gen_range(0..a.len())] = int_vec_to_tuple(vec![-1, -1, -1]);
        assert!(!compare_unordered_tuples(&a, b));
    }
}
