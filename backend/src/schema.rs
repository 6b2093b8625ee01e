// Mirrors the tables created in db.rs

diesel::table! {
    sources (id) {
        id -> Text,
        imei -> Text,
        imsi -> Text,
        readable_name -> Text,
    }
}

diesel::table! {
    measurements (seq) {
        seq -> BigInt,
        id -> Text,
        version -> Text,
        source_id -> Text,
        timestamp -> Text,
        latitude -> Nullable<Double>,
        longitude -> Nullable<Double>,
        accuracy -> Nullable<Double>,
        altitude -> Nullable<Double>,
        age -> Nullable<BigInt>,
        battery -> Double,
        cell_info -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(sources, measurements,);
