//! Diesel table definitions for the Postgres store.

diesel::table! {
    entity_records (id) {
        id -> Uuid,
        entity -> Varchar,
        tenant -> Varchar,
        fields -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    doctor_schedules (id) {
        id -> Int8,
        doctor_id -> Uuid,
        weekday -> Int2,
        start_time -> Time,
        end_time -> Time,
        slot_minutes -> Int4,
    }
}

diesel::table! {
    appointments (id) {
        id -> Uuid,
        patient_id -> Uuid,
        doctor_id -> Uuid,
        start_at -> Timestamptz,
        end_at -> Timestamptz,
        status -> Varchar,
        channel -> Varchar,
        reason -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(entity_records, doctor_schedules, appointments);
